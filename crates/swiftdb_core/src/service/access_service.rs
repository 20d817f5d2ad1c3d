//! Row-level access filtering and grant administration.
//!
//! # Responsibility
//! - Compute which work packages and partners a caller may see.
//! - Decide edit rights on individual deliverables and tasks.
//! - Reconcile a user's grant rows against an admin submission.
//!
//! # Invariants
//! - The admin identity sees and edits everything.
//! - Other callers see exactly the rows they hold a grant for.
//! - Reconciliation statements are independent; one failure never aborts the rest.

use crate::context::{FlashLevel, RequestContext};
use crate::model::record::{Deliverable, RecordId, Task, User};
use crate::model::table::{ChoiceSource, TableKind};
use crate::model::validation::ValidationErrors;
use crate::repo::grant_repo::{GrantKind, GrantRepository};
use crate::repo::record_repo::RecordRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::cross_ref::CrossRefResolver;
use crate::service::{Missing, ServiceError, ServiceResult};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

/// Current grants of one account, as shown on the access form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserGrants {
    pub user: User,
    pub work_packages: Vec<String>,
    pub partners: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantChange {
    pub kind: GrantKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOperation {
    Insert,
    Delete,
}

/// One grant statement that did not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantFailure {
    pub change: GrantChange,
    pub operation: GrantOperation,
    pub reason: String,
}

/// Outcome of one access-form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantReconciliation {
    pub added: Vec<GrantChange>,
    pub removed: Vec<GrantChange>,
    pub failures: Vec<GrantFailure>,
}

impl GrantReconciliation {
    /// True when the submission matched the stored grants exactly.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.failures.is_empty()
    }
}

/// Access filter over records, grants and accounts.
pub struct AccessService<R, G, U>
where
    R: RecordRepository + Copy,
    G: GrantRepository,
    U: UserRepository,
{
    records: R,
    grants: G,
    users: U,
}

impl<R, G, U> AccessService<R, G, U>
where
    R: RecordRepository + Copy,
    G: GrantRepository,
    U: UserRepository,
{
    pub fn new(records: R, grants: G, users: U) -> Self {
        Self {
            records,
            grants,
            users,
        }
    }

    /// Work package codes visible to the caller.
    pub fn visible_work_packages(&self, ctx: &RequestContext) -> ServiceResult<BTreeSet<String>> {
        self.visible(ctx, GrantKind::WorkPackage, ChoiceSource::WorkPackageCodes)
    }

    /// Partner names visible to the caller.
    pub fn visible_partners(&self, ctx: &RequestContext) -> ServiceResult<BTreeSet<String>> {
        self.visible(ctx, GrantKind::Partner, ChoiceSource::PartnerNames)
    }

    /// Admin, or a grant on the deliverable's work package or responsible partner.
    pub fn can_edit_deliverable(
        &self,
        ctx: &RequestContext,
        deliverable: &Deliverable,
    ) -> ServiceResult<bool> {
        let identity = ctx.require_login()?;
        if identity.is_admin() {
            return Ok(true);
        }

        let username = identity.username();
        if let Some(work_package) = deliverable.work_package.as_deref() {
            if self.holds_grant(GrantKind::WorkPackage, username, work_package)? {
                return Ok(true);
            }
        }
        self.holds_grant(GrantKind::Partner, username, &deliverable.responsible_partner)
    }

    /// Admin, a grant on the responsible partner, or a grant on any work
    /// package the task reaches through its deliverables.
    pub fn can_edit_task(&self, ctx: &RequestContext, task: &Task) -> ServiceResult<bool> {
        let identity = ctx.require_login()?;
        if identity.is_admin() {
            return Ok(true);
        }

        let username = identity.username();
        if self.holds_grant(GrantKind::Partner, username, &task.responsible_partner)? {
            return Ok(true);
        }

        let granted: BTreeSet<String> = self
            .grants
            .list_grants(GrantKind::WorkPackage, username)?
            .into_iter()
            .collect();
        let resolver = CrossRefResolver::new(self.records);
        let reachable = resolver.work_packages_for_task(&task.code)?;
        Ok(reachable
            .iter()
            .flatten()
            .any(|work_package| granted.contains(work_package)))
    }

    /// Loads the grants of account `user_id` for the access form.
    pub fn current_grants(&self, ctx: &RequestContext, user_id: RecordId) -> ServiceResult<UserGrants> {
        ctx.require_admin()?;
        let user = self.load_user(user_id)?;
        Ok(UserGrants {
            work_packages: self.grants.list_grants(GrantKind::WorkPackage, &user.username)?,
            partners: self.grants.list_grants(GrantKind::Partner, &user.username)?,
            user,
        })
    }

    /// Makes the grants of account `user_id` equal to the submitted sets.
    ///
    /// Only the difference is written: grants missing from the submission are
    /// deleted, new ones inserted. Each statement is attempted on its own and
    /// failures are reported in the result.
    pub fn reconcile_grants(
        &self,
        ctx: &mut RequestContext,
        user_id: RecordId,
        work_packages: &[String],
        partners: &[String],
    ) -> ServiceResult<GrantReconciliation> {
        ctx.require_admin()?;
        let user = self.load_user(user_id)?;

        let mut errors = ValidationErrors::new();
        let work_packages = self.checked_choices(
            "work_packages",
            ChoiceSource::WorkPackageCodes,
            work_packages,
            &mut errors,
        )?;
        let partners =
            self.checked_choices("partners", ChoiceSource::PartnerNames, partners, &mut errors)?;
        errors.into_result()?;

        let mut report = GrantReconciliation::default();
        self.reconcile_kind(&user.username, GrantKind::WorkPackage, &work_packages, &mut report)?;
        self.reconcile_kind(&user.username, GrantKind::Partner, &partners, &mut report)?;

        info!(
            "event=grant_reconcile module=access status=ok user_id={} added={} removed={} failed={}",
            user.id,
            report.added.len(),
            report.removed.len(),
            report.failures.len()
        );
        ctx.flash(FlashLevel::Success, "Edits successful");
        if !report.failures.is_empty() {
            ctx.flash(
                FlashLevel::Warning,
                format!("{} access change(s) could not be applied", report.failures.len()),
            );
        }
        Ok(report)
    }

    fn visible(
        &self,
        ctx: &RequestContext,
        kind: GrantKind,
        source: ChoiceSource,
    ) -> ServiceResult<BTreeSet<String>> {
        let identity = ctx.require_login()?;
        let existing = self.records.choices(source)?;
        if identity.is_admin() {
            return Ok(existing.into_iter().collect());
        }

        let granted: BTreeSet<String> = self
            .grants
            .list_grants(kind, identity.username())?
            .into_iter()
            .collect();
        Ok(existing
            .into_iter()
            .filter(|value| granted.contains(value))
            .collect())
    }

    fn holds_grant(&self, kind: GrantKind, username: &str, value: &str) -> ServiceResult<bool> {
        Ok(self
            .grants
            .list_grants(kind, username)?
            .iter()
            .any(|granted| granted == value))
    }

    fn load_user(&self, user_id: RecordId) -> ServiceResult<User> {
        self.users
            .get_user(user_id)?
            .ok_or(ServiceError::NotFound(Missing::Record {
                kind: TableKind::Users,
                id: user_id,
            }))
    }

    fn checked_choices(
        &self,
        field: &'static str,
        source: ChoiceSource,
        submitted: &[String],
        errors: &mut ValidationErrors,
    ) -> ServiceResult<BTreeSet<String>> {
        let allowed: BTreeSet<String> = self.records.choices(source)?.into_iter().collect();
        let mut accepted = BTreeSet::new();
        for value in submitted {
            if allowed.contains(value) {
                accepted.insert(value.clone());
            } else {
                errors.push(field, format!("'{value}' is not a valid choice for this field"));
            }
        }
        Ok(accepted)
    }

    fn reconcile_kind(
        &self,
        username: &str,
        kind: GrantKind,
        submitted: &BTreeSet<String>,
        report: &mut GrantReconciliation,
    ) -> ServiceResult<()> {
        let current: BTreeSet<String> = self.grants.list_grants(kind, username)?.into_iter().collect();

        for value in current.difference(submitted) {
            let change = GrantChange {
                kind,
                value: value.clone(),
            };
            match self.grants.delete_grant(kind, username, value) {
                Ok(true) => report.removed.push(change),
                Ok(false) => debug!(
                    "event=grant_delete module=access status=skipped kind={:?} reason=already_gone",
                    kind
                ),
                Err(err) => {
                    warn!(
                        "event=grant_delete module=access status=error kind={:?} error={}",
                        kind, err
                    );
                    report.failures.push(GrantFailure {
                        change,
                        operation: GrantOperation::Delete,
                        reason: err.to_string(),
                    });
                }
            }
        }

        for value in submitted.difference(&current) {
            let change = GrantChange {
                kind,
                value: value.clone(),
            };
            match self.grants.insert_grant(kind, username, value) {
                Ok(()) => report.added.push(change),
                Err(err) => {
                    warn!(
                        "event=grant_insert module=access status=error kind={:?} error={}",
                        kind, err
                    );
                    report.failures.push(GrantFailure {
                        change,
                        operation: GrantOperation::Insert,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
