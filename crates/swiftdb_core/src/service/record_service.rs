//! Admin record lifecycle service.
//!
//! # Responsibility
//! - Provide create/update/delete/view over every `TableKind`.
//! - Check dropdown membership against live rows before writing.
//!
//! # Invariants
//! - Every entry point requires the admin identity.
//! - The first form field of a row never changes after creation.
//! - Account passwords are hashed before they reach the repository.

use crate::auth::password::PasswordHasher;
use crate::context::{FlashLevel, RequestContext, ADMIN_USERNAME};
use crate::model::record::{Record, RecordId, RecordInput, UserInput};
use crate::model::table::{ChoiceSource, FormData, TableKind};
use crate::model::validation::ValidationErrors;
use crate::repo::record_repo::RecordRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::{Missing, ServiceError, ServiceResult};
use log::{info, warn};

/// Admin-only CRUD over the closed set of table kinds.
pub struct RecordService<R, U, H>
where
    R: RecordRepository,
    U: UserRepository,
    H: PasswordHasher,
{
    records: R,
    users: U,
    hasher: H,
}

impl<R, U, H> RecordService<R, U, H>
where
    R: RecordRepository,
    U: UserRepository,
    H: PasswordHasher,
{
    pub fn new(records: R, users: U, hasher: H) -> Self {
        Self {
            records,
            users,
            hasher,
        }
    }

    /// Validates and inserts one record.
    ///
    /// # Errors
    /// - `Validation` for field failures, including unknown dropdown values.
    /// - `DuplicateKey` when the natural key already exists.
    pub fn create(&self, ctx: &mut RequestContext, input: RecordInput) -> ServiceResult<RecordId> {
        ctx.require_admin()?;
        let input = input.normalized();
        let kind = input.kind();
        input.validate()?;
        self.check_selections(&input)?;

        let result = match &input {
            RecordInput::User(user) => self.create_account(user),
            other => self.records.insert(other).map_err(ServiceError::from),
        };
        let id = self.logged("record_create", kind, result)?;

        ctx.flash(FlashLevel::Success, "Added to database");
        Ok(id)
    }

    /// Parses submitted form values for `kind`, then creates the record.
    pub fn create_from_form(
        &self,
        ctx: &mut RequestContext,
        kind: TableKind,
        form: &FormData,
    ) -> ServiceResult<RecordId> {
        ctx.require_admin()?;
        let input = kind.parse_form(form)?;
        self.create(ctx, input)
    }

    /// Replaces every editable field of row `id`.
    ///
    /// Accounts are not editable; the first field must match the stored value.
    pub fn update(
        &self,
        ctx: &mut RequestContext,
        kind: TableKind,
        id: RecordId,
        input: RecordInput,
    ) -> ServiceResult<()> {
        ctx.require_admin()?;
        if !kind.is_editable() {
            return Err(ServiceError::NotFound(Missing::Table(kind.to_string())));
        }
        if input.kind() != kind {
            return Err(ValidationErrors::single(
                "table",
                format!("Submitted fields do not belong to {kind}"),
            )
            .into());
        }

        let input = input.normalized();
        let existing = self.load(kind, id)?;
        if existing.key() != input.key() {
            return Err(ValidationErrors::single(kind.key_field(), "This field cannot be changed").into());
        }
        input.validate()?;
        self.check_selections(&input)?;

        let result = self.records.update(id, &input).map_err(ServiceError::from);
        self.logged("record_update", kind, result)?;

        ctx.flash(FlashLevel::Success, "Edits successful");
        Ok(())
    }

    /// Parses submitted form values for `kind`, then updates row `id`.
    pub fn update_from_form(
        &self,
        ctx: &mut RequestContext,
        kind: TableKind,
        id: RecordId,
        form: &FormData,
    ) -> ServiceResult<()> {
        ctx.require_admin()?;
        let input = kind.parse_form(form)?;
        self.update(ctx, kind, id, input)
    }

    /// Deletes row `id`; fails with `ReferentialConflict` while other rows point at it.
    pub fn delete(&self, ctx: &mut RequestContext, kind: TableKind, id: RecordId) -> ServiceResult<()> {
        ctx.require_admin()?;
        let result = self.records.delete(kind, id).map_err(ServiceError::from);
        self.logged("record_delete", kind, result)?;

        ctx.flash(FlashLevel::Success, "Entry deleted");
        Ok(())
    }

    pub fn get(&self, ctx: &RequestContext, kind: TableKind, id: RecordId) -> ServiceResult<Record> {
        ctx.require_admin()?;
        self.load(kind, id)
    }

    /// Every row of `kind`, ordered by id. Account rows carry no password data.
    pub fn view(&self, ctx: &RequestContext, kind: TableKind) -> ServiceResult<Vec<Record>> {
        ctx.require_admin()?;
        Ok(self.records.list(kind)?)
    }

    /// Dropdown values for a record form.
    pub fn choices(&self, ctx: &RequestContext, source: ChoiceSource) -> ServiceResult<Vec<String>> {
        ctx.require_admin()?;
        Ok(self.records.choices(source)?)
    }

    fn load(&self, kind: TableKind, id: RecordId) -> ServiceResult<Record> {
        self.records
            .get(kind, id)?
            .ok_or(ServiceError::NotFound(Missing::Record { kind, id }))
    }

    fn create_account(&self, input: &UserInput) -> ServiceResult<RecordId> {
        if input.username == ADMIN_USERNAME {
            return Err(ValidationErrors::single("username", "This username is reserved").into());
        }
        let password_hash = self.hasher.hash(&input.password)?;
        Ok(self.users.create_user(&input.username, &password_hash)?)
    }

    fn check_selections(&self, input: &RecordInput) -> ServiceResult<()> {
        let mut errors = ValidationErrors::new();
        for (field, source, value) in selections(input) {
            let allowed = self.records.choices(source)?;
            if !allowed.iter().any(|choice| choice == value) {
                errors.push(field, "Not a valid choice");
            }
        }
        Ok(errors.into_result()?)
    }

    fn logged<T>(&self, event: &str, kind: TableKind, result: ServiceResult<T>) -> ServiceResult<T> {
        match &result {
            Ok(_) => info!(
                "event={event} module=record status=ok table={}",
                kind.table_name()
            ),
            Err(err) => warn!(
                "event={event} module=record status=error table={} error={}",
                kind.table_name(),
                err
            ),
        }
        result
    }
}

/// Dropdown-backed fields of `input` with their submitted values.
fn selections(input: &RecordInput) -> Vec<(&'static str, ChoiceSource, &str)> {
    match input {
        RecordInput::Deliverable(deliverable) => vec![
            (
                "work_package",
                ChoiceSource::WorkPackageCodes,
                deliverable.work_package.as_str(),
            ),
            (
                "responsible_partner",
                ChoiceSource::PartnerNames,
                deliverable.responsible_partner.as_str(),
            ),
        ],
        RecordInput::Task(task) => vec![(
            "responsible_partner",
            ChoiceSource::PartnerNames,
            task.responsible_partner.as_str(),
        )],
        RecordInput::TaskDeliverableLink(link) => vec![
            ("task", ChoiceSource::TaskCodes, link.task.as_str()),
            (
                "deliverable",
                ChoiceSource::DeliverableCodes,
                link.deliverable.as_str(),
            ),
        ],
        RecordInput::Partner(_) | RecordInput::WorkPackage(_) | RecordInput::User(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::selections;
    use crate::model::record::{RecordInput, TaskDeliverableLinkInput, WorkPackageInput};
    use crate::model::table::ChoiceSource;

    #[test]
    fn link_selections_cover_both_fields() {
        let input = RecordInput::TaskDeliverableLink(TaskDeliverableLinkInput {
            task: "T-1".to_string(),
            deliverable: "D-1".to_string(),
        });
        assert_eq!(
            selections(&input),
            vec![
                ("task", ChoiceSource::TaskCodes, "T-1"),
                ("deliverable", ChoiceSource::DeliverableCodes, "D-1"),
            ]
        );
    }

    #[test]
    fn free_text_kinds_have_no_selections() {
        let input = RecordInput::WorkPackage(WorkPackageInput {
            code: "WP-C1".to_string(),
            name: "Training".to_string(),
        });
        assert!(selections(&input).is_empty());
    }
}
