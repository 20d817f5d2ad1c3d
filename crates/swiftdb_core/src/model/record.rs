//! Record shapes for every table kind.
//!
//! # Responsibility
//! - Define persisted read models (`Partner`, `Deliverable`, ...).
//! - Define typed write inputs and their intrinsic validation.
//!
//! # Invariants
//! - `id` is assigned by the store and never part of an input.
//! - `percent` is within `0..=100`, `month_due` within `0..=END_MONTH`.
//! - `User` never carries password material; hashes stay in the repository.

use crate::model::table::TableKind;
use crate::model::validation::ValidationErrors;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt::{Debug, Formatter};

/// Last month of the project timeline, counted from project start.
pub const END_MONTH: i64 = 51;
/// Upper bound of a completion percentage.
pub const MAX_PERCENT: i64 = 100;

const USERNAME_MIN_CHARS: usize = 4;
const USERNAME_MAX_CHARS: usize = 25;

static PASSWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]{8,}$").expect("valid password regex"));

/// Store-assigned surrogate identifier.
pub type RecordId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partner {
    pub id: RecordId,
    pub name: String,
    pub country: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkPackage {
    pub id: RecordId,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deliverable {
    pub id: RecordId,
    pub code: String,
    /// `None` when the deliverable was never attached to a work package.
    pub work_package: Option<String>,
    pub description: String,
    pub responsible_partner: String,
    pub month_due: i64,
    pub progress: Option<String>,
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: RecordId,
    pub code: String,
    pub description: String,
    pub responsible_partner: String,
    pub month_due: i64,
    pub progress: Option<String>,
    pub percent: i64,
}

/// One task↔deliverable association row. Pairs may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDeliverableLink {
    pub id: RecordId,
    pub task: String,
    pub deliverable: String,
}

/// Login account without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: RecordId,
    pub username: String,
}

/// Any persisted record, tagged by table kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum Record {
    Partner(Partner),
    WorkPackage(WorkPackage),
    Deliverable(Deliverable),
    User(User),
    Task(Task),
    TaskDeliverableLink(TaskDeliverableLink),
}

impl Record {
    /// Value of the immutable first field.
    pub fn key(&self) -> &str {
        match self {
            Self::Partner(row) => &row.name,
            Self::WorkPackage(row) => &row.code,
            Self::Deliverable(row) => &row.code,
            Self::User(row) => &row.username,
            Self::Task(row) => &row.code,
            Self::TaskDeliverableLink(row) => &row.task,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerInput {
    pub name: String,
    pub country: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPackageInput {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverableInput {
    pub code: String,
    pub work_package: String,
    pub description: String,
    pub responsible_partner: String,
    pub month_due: i64,
    pub progress: Option<String>,
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub code: String,
    pub description: String,
    pub responsible_partner: String,
    pub month_due: i64,
    pub progress: Option<String>,
    pub percent: i64,
}

impl DeliverableInput {
    pub fn normalized(self) -> Self {
        Self {
            code: trimmed(self.code),
            work_package: trimmed(self.work_package),
            description: trimmed(self.description),
            responsible_partner: trimmed(self.responsible_partner),
            progress: optional(self.progress),
            ..self
        }
    }
}

impl TaskInput {
    pub fn normalized(self) -> Self {
        Self {
            code: trimmed(self.code),
            description: trimmed(self.description),
            responsible_partner: trimmed(self.responsible_partner),
            progress: optional(self.progress),
            ..self
        }
    }
}

/// Form pre-populated from a stored row.
impl From<&Deliverable> for DeliverableInput {
    fn from(row: &Deliverable) -> Self {
        Self {
            code: row.code.clone(),
            work_package: row.work_package.clone().unwrap_or_default(),
            description: row.description.clone(),
            responsible_partner: row.responsible_partner.clone(),
            month_due: row.month_due,
            progress: row.progress.clone(),
            percent: row.percent,
        }
    }
}

impl From<&Task> for TaskInput {
    fn from(row: &Task) -> Self {
        Self {
            code: row.code.clone(),
            description: row.description.clone(),
            responsible_partner: row.responsible_partner.clone(),
            month_due: row.month_due,
            progress: row.progress.clone(),
            percent: row.percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDeliverableLinkInput {
    pub task: String,
    pub deliverable: String,
}

/// New account request. `password` is plaintext until hashed by the service.
#[derive(Clone, PartialEq, Eq)]
pub struct UserInput {
    pub username: String,
    pub password: String,
}

impl Debug for UserInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserInput")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Typed write payload for one table kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordInput {
    Partner(PartnerInput),
    WorkPackage(WorkPackageInput),
    Deliverable(DeliverableInput),
    User(UserInput),
    Task(TaskInput),
    TaskDeliverableLink(TaskDeliverableLinkInput),
}

impl RecordInput {
    pub fn kind(&self) -> TableKind {
        match self {
            Self::Partner(_) => TableKind::Partners,
            Self::WorkPackage(_) => TableKind::WorkPackages,
            Self::Deliverable(_) => TableKind::Deliverables,
            Self::User(_) => TableKind::Users,
            Self::Task(_) => TableKind::Tasks,
            Self::TaskDeliverableLink(_) => TableKind::TaskDeliverableLinks,
        }
    }

    /// Value submitted for the immutable first field.
    pub fn key(&self) -> &str {
        match self {
            Self::Partner(input) => &input.name,
            Self::WorkPackage(input) => &input.code,
            Self::Deliverable(input) => &input.code,
            Self::User(input) => &input.username,
            Self::Task(input) => &input.code,
            Self::TaskDeliverableLink(input) => &input.task,
        }
    }

    /// Trims every text field and clears blank optional ones.
    ///
    /// Natural keys and references are compared verbatim by the store, so
    /// every write path normalizes before validating. Passwords are untouched.
    pub fn normalized(self) -> Self {
        match self {
            Self::Partner(input) => Self::Partner(PartnerInput {
                name: trimmed(input.name),
                country: optional(input.country),
                role: optional(input.role),
            }),
            Self::WorkPackage(input) => Self::WorkPackage(WorkPackageInput {
                code: trimmed(input.code),
                name: trimmed(input.name),
            }),
            Self::Deliverable(input) => Self::Deliverable(input.normalized()),
            Self::User(input) => Self::User(UserInput {
                username: trimmed(input.username),
                password: input.password,
            }),
            Self::Task(input) => Self::Task(input.normalized()),
            Self::TaskDeliverableLink(input) => {
                Self::TaskDeliverableLink(TaskDeliverableLinkInput {
                    task: trimmed(input.task),
                    deliverable: trimmed(input.deliverable),
                })
            }
        }
    }

    /// Checks constraints that need no store access.
    ///
    /// Dropdown membership is checked by the record service against live rows.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self {
            Self::Partner(input) => errors.require("name", &input.name),
            Self::WorkPackage(input) => {
                errors.require("code", &input.code);
                errors.require("name", &input.name);
            }
            Self::Deliverable(input) => {
                errors.require("code", &input.code);
                errors.require_selection("work_package", &input.work_package);
                errors.require("description", &input.description);
                errors.require_selection("responsible_partner", &input.responsible_partner);
                errors.require_range("month_due", input.month_due, 0, END_MONTH);
                errors.require_range("percent", input.percent, 0, MAX_PERCENT);
            }
            Self::User(input) => {
                errors.extend(validate_username(&input.username));
                errors.extend(validate_password("password", &input.password));
            }
            Self::Task(input) => {
                errors.require("code", &input.code);
                errors.require("description", &input.description);
                errors.require_selection("responsible_partner", &input.responsible_partner);
                errors.require_range("month_due", input.month_due, 0, END_MONTH);
                errors.require_range("percent", input.percent, 0, MAX_PERCENT);
            }
            Self::TaskDeliverableLink(input) => {
                errors.require_selection("task", &input.task);
                errors.require_selection("deliverable", &input.deliverable);
            }
        }
        errors.into_result()
    }
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(trimmed).filter(|value| !value.is_empty())
}

fn validate_username(username: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let chars = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&chars) {
        errors.push(
            "username",
            format!(
                "Field must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters long."
            ),
        );
    }
    errors
}

/// Checks the account password policy: 8+ ASCII letters or digits.
pub fn validate_password(field: &'static str, password: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if !PASSWORD_RE.is_match(password) {
        errors.push(
            field,
            "Password must be mimimum 8 characters and contain only uppercase letters, lowercase letters and numbers",
        );
    }
    errors
}
