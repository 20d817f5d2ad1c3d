//! Task ↔ work package resolution through deliverable links.
//!
//! A task belongs to a work package when it is linked to at least one of that
//! work package's deliverables. Both directions re-scan the store on every
//! call; results reflect whatever is committed at that moment.

use crate::repo::record_repo::RecordRepository;
use crate::repo::RepoResult;

/// Read-only resolver over the link and deliverable relations.
#[derive(Clone, Copy)]
pub struct CrossRefResolver<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> CrossRefResolver<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Task codes linked to any deliverable of `wp_code`.
    ///
    /// Ordered by deliverable id, then link id; duplicates keep first position.
    pub fn tasks_for_work_package(&self, wp_code: &str) -> RepoResult<Vec<String>> {
        let mut tasks = Vec::new();
        for deliverable in self.repo.deliverables_by_work_package(wp_code)? {
            for link in self.repo.links_by_deliverable(&deliverable.code)? {
                push_unique(&mut tasks, link.task);
            }
        }
        Ok(tasks)
    }

    /// Work packages reached from `task_code` through its linked deliverables.
    ///
    /// A link whose deliverable is missing or has no work package yields `None`.
    pub fn work_packages_for_task(&self, task_code: &str) -> RepoResult<Vec<Option<String>>> {
        let mut work_packages = Vec::new();
        for link in self.repo.links_by_task(task_code)? {
            let work_package = self
                .repo
                .deliverable_by_code(&link.deliverable)?
                .and_then(|deliverable| deliverable.work_package);
            push_unique(&mut work_packages, work_package);
        }
        Ok(work_packages)
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
