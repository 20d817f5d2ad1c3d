//! Work package and partner views for grant holders.
//!
//! # Responsibility
//! - List the work packages and partners a caller leads.
//! - Summarize one work package or partner with its deliverables and tasks.
//! - Let grant holders update progress on deliverables and tasks.
//!
//! # Invariants
//! - Non-admin callers never read or write rows outside their grants.
//! - Self-service edits only change `progress` and `percent`.

use crate::context::{FlashLevel, RequestContext};
use crate::model::record::{
    Deliverable, DeliverableInput, Partner, Record, RecordId, RecordInput, Task, TaskInput,
    WorkPackage, MAX_PERCENT,
};
use crate::model::table::TableKind;
use crate::model::validation::ValidationErrors;
use crate::repo::grant_repo::GrantRepository;
use crate::repo::record_repo::RecordRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::access_service::AccessService;
use crate::service::cross_ref::CrossRefResolver;
use crate::service::{Missing, ServiceError, ServiceResult};
use log::info;
use serde::Serialize;

/// Deliverables and tasks belonging to one work package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkPackageSummary {
    pub work_package: WorkPackage,
    pub deliverables: Vec<Deliverable>,
    pub tasks: Vec<Task>,
}

/// Deliverables and tasks a partner is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartnerSummary {
    pub partner: Partner,
    pub deliverables: Vec<Deliverable>,
    pub tasks: Vec<Task>,
}

pub struct LeadService<R, G, U>
where
    R: RecordRepository + Copy,
    G: GrantRepository,
    U: UserRepository,
{
    records: R,
    access: AccessService<R, G, U>,
}

impl<R, G, U> LeadService<R, G, U>
where
    R: RecordRepository + Copy,
    G: GrantRepository,
    U: UserRepository,
{
    pub fn new(records: R, grants: G, users: U) -> Self {
        Self {
            records,
            access: AccessService::new(records, grants, users),
        }
    }

    /// Access filter shared with this service.
    pub fn access(&self) -> &AccessService<R, G, U> {
        &self.access
    }

    /// Work packages visible to the caller, ordered by id.
    pub fn wp_list(&self, ctx: &RequestContext) -> ServiceResult<Vec<WorkPackage>> {
        let visible = self.access.visible_work_packages(ctx)?;
        Ok(self
            .records
            .list(TableKind::WorkPackages)?
            .into_iter()
            .filter_map(|record| match record {
                Record::WorkPackage(row) if visible.contains(&row.code) => Some(row),
                _ => None,
            })
            .collect())
    }

    /// Partners visible to the caller, ordered by id.
    pub fn partner_list(&self, ctx: &RequestContext) -> ServiceResult<Vec<Partner>> {
        let visible = self.access.visible_partners(ctx)?;
        Ok(self
            .records
            .list(TableKind::Partners)?
            .into_iter()
            .filter_map(|record| match record {
                Record::Partner(row) if visible.contains(&row.name) => Some(row),
                _ => None,
            })
            .collect())
    }

    /// Deliverables of work package `id` plus every task linked to them.
    pub fn wp_summary(&self, ctx: &RequestContext, id: RecordId) -> ServiceResult<WorkPackageSummary> {
        ctx.require_login()?;
        let work_package = match self.load(TableKind::WorkPackages, id)? {
            Record::WorkPackage(row) => row,
            _ => return Err(not_found(TableKind::WorkPackages, id)),
        };
        if !self.access.visible_work_packages(ctx)?.contains(&work_package.code) {
            return Err(ServiceError::Forbidden);
        }

        let deliverables = self.records.deliverables_by_work_package(&work_package.code)?;
        let task_codes = CrossRefResolver::new(self.records).tasks_for_work_package(&work_package.code)?;
        let tasks = self.records.tasks_by_codes(&task_codes)?;
        Ok(WorkPackageSummary {
            work_package,
            deliverables,
            tasks,
        })
    }

    /// Deliverables and tasks partner `id` is responsible for.
    pub fn partner_summary(&self, ctx: &RequestContext, id: RecordId) -> ServiceResult<PartnerSummary> {
        ctx.require_login()?;
        let partner = match self.load(TableKind::Partners, id)? {
            Record::Partner(row) => row,
            _ => return Err(not_found(TableKind::Partners, id)),
        };
        if !self.access.visible_partners(ctx)?.contains(&partner.name) {
            return Err(ServiceError::Forbidden);
        }

        Ok(PartnerSummary {
            deliverables: self.records.deliverables_by_partner(&partner.name)?,
            tasks: self.records.tasks_by_partner(&partner.name)?,
            partner,
        })
    }

    /// Deliverable `id`, if the caller may edit it.
    pub fn deliverable_for_edit(&self, ctx: &RequestContext, id: RecordId) -> ServiceResult<Deliverable> {
        ctx.require_login()?;
        let stored = match self.load(TableKind::Deliverables, id)? {
            Record::Deliverable(row) => row,
            _ => return Err(not_found(TableKind::Deliverables, id)),
        };
        if !self.access.can_edit_deliverable(ctx, &stored)? {
            return Err(ServiceError::Forbidden);
        }
        Ok(stored)
    }

    /// Task `id`, if the caller may edit it.
    pub fn task_for_edit(&self, ctx: &RequestContext, id: RecordId) -> ServiceResult<Task> {
        ctx.require_login()?;
        let stored = match self.load(TableKind::Tasks, id)? {
            Record::Task(row) => row,
            _ => return Err(not_found(TableKind::Tasks, id)),
        };
        if !self.access.can_edit_task(ctx, &stored)? {
            return Err(ServiceError::Forbidden);
        }
        Ok(stored)
    }

    /// Updates `progress` and `percent` of deliverable `id`.
    ///
    /// Every other submitted field must equal the stored value.
    pub fn edit_deliverable(
        &self,
        ctx: &mut RequestContext,
        id: RecordId,
        input: DeliverableInput,
    ) -> ServiceResult<()> {
        let stored = self.deliverable_for_edit(ctx, id)?;
        let input = input.normalized();

        let mut errors = ValidationErrors::new();
        lock(&mut errors, "code", &stored.code, &input.code);
        lock(
            &mut errors,
            "work_package",
            stored.work_package.as_deref().unwrap_or_default(),
            &input.work_package,
        );
        lock(&mut errors, "description", &stored.description, &input.description);
        lock(
            &mut errors,
            "responsible_partner",
            &stored.responsible_partner,
            &input.responsible_partner,
        );
        lock_number(&mut errors, "month_due", stored.month_due, input.month_due);
        errors.require_range("percent", input.percent, 0, MAX_PERCENT);
        errors.into_result()?;

        // Locked columns come from the stored row; an unset work package stays NULL.
        let update = RecordInput::Deliverable(DeliverableInput {
            code: stored.code,
            work_package: stored.work_package.unwrap_or_default(),
            description: stored.description,
            responsible_partner: stored.responsible_partner,
            month_due: stored.month_due,
            progress: input.progress,
            percent: input.percent,
        });
        self.records.update(id, &update)?;

        info!("event=deliverable_progress module=lead status=ok id={id}");
        ctx.flash(FlashLevel::Success, "Edits successful");
        Ok(())
    }

    /// Updates `progress` and `percent` of task `id`.
    ///
    /// Every other submitted field must equal the stored value.
    pub fn edit_task(&self, ctx: &mut RequestContext, id: RecordId, input: TaskInput) -> ServiceResult<()> {
        let stored = self.task_for_edit(ctx, id)?;
        let input = input.normalized();

        let mut errors = ValidationErrors::new();
        lock(&mut errors, "code", &stored.code, &input.code);
        lock(&mut errors, "description", &stored.description, &input.description);
        lock(
            &mut errors,
            "responsible_partner",
            &stored.responsible_partner,
            &input.responsible_partner,
        );
        lock_number(&mut errors, "month_due", stored.month_due, input.month_due);
        errors.require_range("percent", input.percent, 0, MAX_PERCENT);
        errors.into_result()?;

        let update = RecordInput::Task(TaskInput {
            code: stored.code,
            description: stored.description,
            responsible_partner: stored.responsible_partner,
            month_due: stored.month_due,
            progress: input.progress,
            percent: input.percent,
        });
        self.records.update(id, &update)?;

        info!("event=task_progress module=lead status=ok id={id}");
        ctx.flash(FlashLevel::Success, "Edits successful");
        Ok(())
    }

    fn load(&self, kind: TableKind, id: RecordId) -> ServiceResult<Record> {
        self.records.get(kind, id)?.ok_or(not_found(kind, id))
    }
}

fn not_found(kind: TableKind, id: RecordId) -> ServiceError {
    ServiceError::NotFound(Missing::Record { kind, id })
}

fn lock(errors: &mut ValidationErrors, field: &'static str, stored: &str, submitted: &str) {
    if stored != submitted {
        errors.push(field, "This field cannot be changed");
    }
}

fn lock_number(errors: &mut ValidationErrors, field: &'static str, stored: i64, submitted: i64) {
    if stored != submitted {
        errors.push(field, "This field cannot be changed");
    }
}
