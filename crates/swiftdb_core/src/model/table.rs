//! Closed set of table kinds and their static form layouts.
//!
//! # Responsibility
//! - Resolve externally supplied table names against a fixed allow-list.
//! - Map each kind to its SQL table, form fields, and form parser.
//!
//! # Invariants
//! - Unknown table names never reach SQL; they resolve to `None`.
//! - The first field of every layout is the immutable key field.

use crate::model::record::{
    DeliverableInput, PartnerInput, RecordInput, TaskDeliverableLinkInput, TaskInput, UserInput,
    WorkPackageInput,
};
use crate::model::validation::ValidationErrors;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Flat field map as submitted by a form.
pub type FormData = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TableKind {
    Partners,
    WorkPackages,
    Deliverables,
    Users,
    Tasks,
    TaskDeliverableLinks,
}

/// Source rows for a dropdown field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChoiceSource {
    WorkPackageCodes,
    PartnerNames,
    TaskCodes,
    DeliverableCodes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldWidget {
    Text,
    TextArea,
    Integer,
    Password,
    Select(ChoiceSource),
}

/// One form field of a table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: FieldWidget,
    pub required: bool,
}

const fn field(
    name: &'static str,
    label: &'static str,
    widget: FieldWidget,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        widget,
        required,
    }
}

const PARTNER_FIELDS: &[FieldSpec] = &[
    field("name", "Partner Name", FieldWidget::Text, true),
    field("country", "Country", FieldWidget::Text, false),
    field("role", "Role", FieldWidget::Text, false),
];

const WORK_PACKAGE_FIELDS: &[FieldSpec] = &[
    field("code", "Work Package Code", FieldWidget::Text, true),
    field("name", "Name", FieldWidget::Text, true),
];

const DELIVERABLE_FIELDS: &[FieldSpec] = &[
    field("code", "Deliverable Code", FieldWidget::Text, true),
    field(
        "work_package",
        "Work Package",
        FieldWidget::Select(ChoiceSource::WorkPackageCodes),
        true,
    ),
    field("description", "Description", FieldWidget::TextArea, true),
    field(
        "responsible_partner",
        "Responsible Partner",
        FieldWidget::Select(ChoiceSource::PartnerNames),
        true,
    ),
    field("month_due", "Month Due", FieldWidget::Integer, true),
    field("progress", "Progress", FieldWidget::TextArea, false),
    field("percent", "Percentage Complete", FieldWidget::Integer, true),
];

const USER_FIELDS: &[FieldSpec] = &[
    field("username", "Username", FieldWidget::Text, true),
    field("password", "Password", FieldWidget::Password, true),
];

const TASK_FIELDS: &[FieldSpec] = &[
    field("code", "Task Code", FieldWidget::Text, true),
    field("description", "Description", FieldWidget::TextArea, true),
    field(
        "responsible_partner",
        "Responsible Partner",
        FieldWidget::Select(ChoiceSource::PartnerNames),
        true,
    ),
    field("month_due", "Month Due", FieldWidget::Integer, true),
    field("progress", "Progress", FieldWidget::TextArea, false),
    field("percent", "Percentage Complete", FieldWidget::Integer, true),
];

const LINK_FIELDS: &[FieldSpec] = &[
    field(
        "task",
        "Task",
        FieldWidget::Select(ChoiceSource::TaskCodes),
        true,
    ),
    field(
        "deliverable",
        "Deliverable",
        FieldWidget::Select(ChoiceSource::DeliverableCodes),
        true,
    ),
];

impl TableKind {
    pub const ALL: [TableKind; 6] = [
        TableKind::Partners,
        TableKind::WorkPackages,
        TableKind::Deliverables,
        TableKind::Users,
        TableKind::Tasks,
        TableKind::TaskDeliverableLinks,
    ];

    /// Resolves an external table name. Only allow-listed names resolve.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// External (route) name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Partners => "Partners",
            Self::WorkPackages => "Work_Packages",
            Self::Deliverables => "Deliverables",
            Self::Users => "Users",
            Self::Tasks => "Tasks",
            Self::TaskDeliverableLinks => "Tasks2Deliverables",
        }
    }

    /// SQL table backing this kind.
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Partners => "partners",
            Self::WorkPackages => "work_packages",
            Self::Deliverables => "deliverables",
            Self::Users => "users",
            Self::Tasks => "tasks",
            Self::TaskDeliverableLinks => "tasks2deliverables",
        }
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Partners => PARTNER_FIELDS,
            Self::WorkPackages => WORK_PACKAGE_FIELDS,
            Self::Deliverables => DELIVERABLE_FIELDS,
            Self::Users => USER_FIELDS,
            Self::Tasks => TASK_FIELDS,
            Self::TaskDeliverableLinks => LINK_FIELDS,
        }
    }

    /// Name of the immutable first field.
    pub fn key_field(self) -> &'static str {
        self.fields()[0].name
    }

    /// Accounts are created and deleted but never edited in place.
    pub fn is_editable(self) -> bool {
        self != Self::Users
    }

    /// Builds a typed input from submitted form values.
    ///
    /// Collects every field failure rather than stopping at the first one.
    pub fn parse_form(self, form: &FormData) -> Result<RecordInput, ValidationErrors> {
        let mut reader = FormReader::new(form);
        let input = match self {
            Self::Partners => RecordInput::Partner(PartnerInput {
                name: reader.text("name"),
                country: reader.optional_text("country"),
                role: reader.optional_text("role"),
            }),
            Self::WorkPackages => RecordInput::WorkPackage(WorkPackageInput {
                code: reader.text("code"),
                name: reader.text("name"),
            }),
            Self::Deliverables => RecordInput::Deliverable(DeliverableInput {
                code: reader.text("code"),
                work_package: reader.text("work_package"),
                description: reader.text("description"),
                responsible_partner: reader.text("responsible_partner"),
                month_due: reader.integer("month_due"),
                progress: reader.optional_text("progress"),
                percent: reader.integer("percent"),
            }),
            Self::Users => RecordInput::User(UserInput {
                username: reader.text("username"),
                password: reader.raw("password"),
            }),
            Self::Tasks => RecordInput::Task(TaskInput {
                code: reader.text("code"),
                description: reader.text("description"),
                responsible_partner: reader.text("responsible_partner"),
                month_due: reader.integer("month_due"),
                progress: reader.optional_text("progress"),
                percent: reader.integer("percent"),
            }),
            Self::TaskDeliverableLinks => {
                RecordInput::TaskDeliverableLink(TaskDeliverableLinkInput {
                    task: reader.text("task"),
                    deliverable: reader.text("deliverable"),
                })
            }
        };

        let mut errors = reader.finish();
        if let Err(intrinsic) = input.validate() {
            for error in intrinsic.errors() {
                // Skip range noise on integers that already failed to parse.
                if errors.message_for(error.field).is_none() {
                    errors.push(error.field, error.message.clone());
                }
            }
        }
        errors.into_result().map(|()| input)
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct FormReader<'a> {
    form: &'a FormData,
    errors: ValidationErrors,
}

impl<'a> FormReader<'a> {
    fn new(form: &'a FormData) -> Self {
        Self {
            form,
            errors: ValidationErrors::new(),
        }
    }

    fn raw(&self, name: &str) -> String {
        self.form.get(name).cloned().unwrap_or_default()
    }

    fn text(&self, name: &str) -> String {
        self.raw(name).trim().to_string()
    }

    fn optional_text(&self, name: &str) -> Option<String> {
        let value = self.text(name);
        (!value.is_empty()).then_some(value)
    }

    fn integer(&mut self, name: &'static str) -> i64 {
        match self.text(name).parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                self.errors.push(name, "Not a valid integer value");
                0
            }
        }
    }

    fn finish(self) -> ValidationErrors {
        self.errors
    }
}
