//! Record repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over every `TableKind` with a static SQL mapping.
//! - Provide the lookups used by cross-reference and access checks.
//!
//! # Invariants
//! - Table names only come from `TableKind::table_name`, never from callers.
//! - Listings are ordered by `id ASC`.
//! - Updates never touch the immutable key column.
//! - Account rows are written by `UserRepository`; this repository only reads
//!   and deletes them, and never selects the password column.

use crate::model::record::{
    Deliverable, Partner, Record, RecordId, RecordInput, Task, TaskDeliverableLink, User,
    WorkPackage,
};
use crate::model::table::{ChoiceSource, TableKind};
use crate::repo::{delete_error, ensure_connection_ready, write_error, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Params, Row};

const PARTNER_SELECT_SQL: &str = "SELECT id, name, country, role FROM partners";
const WORK_PACKAGE_SELECT_SQL: &str = "SELECT id, code, name FROM work_packages";
const DELIVERABLE_SELECT_SQL: &str = "SELECT
    id,
    code,
    work_package,
    description,
    responsible_partner,
    month_due,
    progress,
    percent
FROM deliverables";
const TASK_SELECT_SQL: &str = "SELECT
    id,
    code,
    description,
    responsible_partner,
    month_due,
    progress,
    percent
FROM tasks";
const LINK_SELECT_SQL: &str = "SELECT id, task, deliverable FROM tasks2deliverables";
const USER_SELECT_SQL: &str = "SELECT id, username FROM users";

const REQUIRED_TABLES: &[&str] = &[
    "partners",
    "work_packages",
    "deliverables",
    "tasks",
    "tasks2deliverables",
    "users",
];

/// Repository interface for record CRUD and reference lookups.
pub trait RecordRepository {
    /// Inserts one non-account record and returns its new id.
    fn insert(&self, input: &RecordInput) -> RepoResult<RecordId>;
    /// Replaces every editable (non-key) column of row `id`.
    fn update(&self, id: RecordId, input: &RecordInput) -> RepoResult<()>;
    fn get(&self, kind: TableKind, id: RecordId) -> RepoResult<Option<Record>>;
    fn list(&self, kind: TableKind) -> RepoResult<Vec<Record>>;
    /// Deletes row `id`; blocked by the store when other rows reference it.
    fn delete(&self, kind: TableKind, id: RecordId) -> RepoResult<()>;
    /// Natural keys for a dropdown, ordered by id.
    fn choices(&self, source: ChoiceSource) -> RepoResult<Vec<String>>;
    fn deliverable_by_code(&self, code: &str) -> RepoResult<Option<Deliverable>>;
    fn deliverables_by_work_package(&self, work_package: &str) -> RepoResult<Vec<Deliverable>>;
    fn deliverables_by_partner(&self, partner: &str) -> RepoResult<Vec<Deliverable>>;
    fn tasks_by_partner(&self, partner: &str) -> RepoResult<Vec<Task>>;
    /// Tasks whose code is in `codes`, ordered by id.
    fn tasks_by_codes(&self, codes: &[String]) -> RepoResult<Vec<Task>>;
    fn links_by_deliverable(&self, deliverable: &str) -> RepoResult<Vec<TaskDeliverableLink>>;
    fn links_by_task(&self, task: &str) -> RepoResult<Vec<TaskDeliverableLink>>;
}

/// SQLite-backed record repository.
#[derive(Clone, Copy)]
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn insert(&self, input: &RecordInput) -> RepoResult<RecordId> {
        let table = input.kind().table_name();
        let result = match input {
            RecordInput::Partner(partner) => self.conn.execute(
                "INSERT INTO partners (name, country, role) VALUES (?1, ?2, ?3);",
                params![partner.name, partner.country, partner.role],
            ),
            RecordInput::WorkPackage(work_package) => self.conn.execute(
                "INSERT INTO work_packages (code, name) VALUES (?1, ?2);",
                params![work_package.code, work_package.name],
            ),
            RecordInput::Deliverable(deliverable) => self.conn.execute(
                "INSERT INTO deliverables (
                    code,
                    work_package,
                    description,
                    responsible_partner,
                    month_due,
                    progress,
                    percent
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    deliverable.code,
                    non_empty(&deliverable.work_package),
                    deliverable.description,
                    deliverable.responsible_partner,
                    deliverable.month_due,
                    deliverable.progress,
                    deliverable.percent,
                ],
            ),
            RecordInput::Task(task) => self.conn.execute(
                "INSERT INTO tasks (
                    code,
                    description,
                    responsible_partner,
                    month_due,
                    progress,
                    percent
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    task.code,
                    task.description,
                    task.responsible_partner,
                    task.month_due,
                    task.progress,
                    task.percent,
                ],
            ),
            RecordInput::TaskDeliverableLink(link) => self.conn.execute(
                "INSERT INTO tasks2deliverables (task, deliverable) VALUES (?1, ?2);",
                params![link.task, link.deliverable],
            ),
            RecordInput::User(_) => {
                return Err(RepoError::Unsupported(
                    "accounts are created through the user repository".to_string(),
                ));
            }
        };

        result.map_err(|err| write_error(table, err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: RecordId, input: &RecordInput) -> RepoResult<()> {
        let kind = input.kind();
        let result = match input {
            RecordInput::Partner(partner) => self.conn.execute(
                "UPDATE partners SET country = ?2, role = ?3 WHERE id = ?1;",
                params![id, partner.country, partner.role],
            ),
            RecordInput::WorkPackage(work_package) => self.conn.execute(
                "UPDATE work_packages SET name = ?2 WHERE id = ?1;",
                params![id, work_package.name],
            ),
            RecordInput::Deliverable(deliverable) => self.conn.execute(
                "UPDATE deliverables
                 SET
                    work_package = ?2,
                    description = ?3,
                    responsible_partner = ?4,
                    month_due = ?5,
                    progress = ?6,
                    percent = ?7
                 WHERE id = ?1;",
                params![
                    id,
                    non_empty(&deliverable.work_package),
                    deliverable.description,
                    deliverable.responsible_partner,
                    deliverable.month_due,
                    deliverable.progress,
                    deliverable.percent,
                ],
            ),
            RecordInput::Task(task) => self.conn.execute(
                "UPDATE tasks
                 SET
                    description = ?2,
                    responsible_partner = ?3,
                    month_due = ?4,
                    progress = ?5,
                    percent = ?6
                 WHERE id = ?1;",
                params![
                    id,
                    task.description,
                    task.responsible_partner,
                    task.month_due,
                    task.progress,
                    task.percent,
                ],
            ),
            RecordInput::TaskDeliverableLink(link) => self.conn.execute(
                "UPDATE tasks2deliverables SET deliverable = ?2 WHERE id = ?1;",
                params![id, link.deliverable],
            ),
            RecordInput::User(_) => {
                return Err(RepoError::Unsupported(
                    "accounts are not edited in place".to_string(),
                ));
            }
        };

        let changed = result.map_err(|err| write_error(kind.table_name(), err))?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind, id });
        }
        Ok(())
    }

    fn get(&self, kind: TableKind, id: RecordId) -> RepoResult<Option<Record>> {
        let sql = format!("{} WHERE id = ?1;", select_sql(kind));
        let mut records = query_records(self.conn, kind, &sql, [id])?;
        Ok(records.pop())
    }

    fn list(&self, kind: TableKind) -> RepoResult<Vec<Record>> {
        let sql = format!("{} ORDER BY id ASC;", select_sql(kind));
        query_records(self.conn, kind, &sql, [])
    }

    fn delete(&self, kind: TableKind, id: RecordId) -> RepoResult<()> {
        let table = kind.table_name();
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])
            .map_err(|err| delete_error(table, err))?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind, id });
        }
        Ok(())
    }

    fn choices(&self, source: ChoiceSource) -> RepoResult<Vec<String>> {
        let sql = match source {
            ChoiceSource::WorkPackageCodes => "SELECT code FROM work_packages ORDER BY id ASC;",
            ChoiceSource::PartnerNames => "SELECT name FROM partners ORDER BY id ASC;",
            ChoiceSource::TaskCodes => "SELECT code FROM tasks ORDER BY id ASC;",
            ChoiceSource::DeliverableCodes => "SELECT code FROM deliverables ORDER BY id ASC;",
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(row.get(0)?);
        }
        Ok(values)
    }

    fn deliverable_by_code(&self, code: &str) -> RepoResult<Option<Deliverable>> {
        let sql = format!("{DELIVERABLE_SELECT_SQL} WHERE code = ?1;");
        let mut rows = query_rows(self.conn, &sql, [code], parse_deliverable_row)?;
        Ok(rows.pop())
    }

    fn deliverables_by_work_package(&self, work_package: &str) -> RepoResult<Vec<Deliverable>> {
        let sql = format!("{DELIVERABLE_SELECT_SQL} WHERE work_package = ?1 ORDER BY id ASC;");
        query_rows(self.conn, &sql, [work_package], parse_deliverable_row)
    }

    fn deliverables_by_partner(&self, partner: &str) -> RepoResult<Vec<Deliverable>> {
        let sql =
            format!("{DELIVERABLE_SELECT_SQL} WHERE responsible_partner = ?1 ORDER BY id ASC;");
        query_rows(self.conn, &sql, [partner], parse_deliverable_row)
    }

    fn tasks_by_partner(&self, partner: &str) -> RepoResult<Vec<Task>> {
        let sql = format!("{TASK_SELECT_SQL} WHERE responsible_partner = ?1 ORDER BY id ASC;");
        query_rows(self.conn, &sql, [partner], parse_task_row)
    }

    fn tasks_by_codes(&self, codes: &[String]) -> RepoResult<Vec<Task>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; codes.len()].join(", ");
        let sql = format!("{TASK_SELECT_SQL} WHERE code IN ({placeholders}) ORDER BY id ASC;");
        let bind_values = codes.iter().cloned().map(Value::Text);
        query_rows(
            self.conn,
            &sql,
            params_from_iter(bind_values),
            parse_task_row,
        )
    }

    fn links_by_deliverable(&self, deliverable: &str) -> RepoResult<Vec<TaskDeliverableLink>> {
        let sql = format!("{LINK_SELECT_SQL} WHERE deliverable = ?1 ORDER BY id ASC;");
        query_rows(self.conn, &sql, [deliverable], parse_link_row)
    }

    fn links_by_task(&self, task: &str) -> RepoResult<Vec<TaskDeliverableLink>> {
        let sql = format!("{LINK_SELECT_SQL} WHERE task = ?1 ORDER BY id ASC;");
        query_rows(self.conn, &sql, [task], parse_link_row)
    }
}

/// Stores an empty reference as NULL.
fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn select_sql(kind: TableKind) -> &'static str {
    match kind {
        TableKind::Partners => PARTNER_SELECT_SQL,
        TableKind::WorkPackages => WORK_PACKAGE_SELECT_SQL,
        TableKind::Deliverables => DELIVERABLE_SELECT_SQL,
        TableKind::Users => USER_SELECT_SQL,
        TableKind::Tasks => TASK_SELECT_SQL,
        TableKind::TaskDeliverableLinks => LINK_SELECT_SQL,
    }
}

fn query_records<P: Params>(
    conn: &Connection,
    kind: TableKind,
    sql: &str,
    params: P,
) -> RepoResult<Vec<Record>> {
    match kind {
        TableKind::Partners => query_rows(conn, sql, params, parse_partner_row)
            .map(|rows| rows.into_iter().map(Record::Partner).collect()),
        TableKind::WorkPackages => query_rows(conn, sql, params, parse_work_package_row)
            .map(|rows| rows.into_iter().map(Record::WorkPackage).collect()),
        TableKind::Deliverables => query_rows(conn, sql, params, parse_deliverable_row)
            .map(|rows| rows.into_iter().map(Record::Deliverable).collect()),
        TableKind::Users => query_rows(conn, sql, params, parse_user_row)
            .map(|rows| rows.into_iter().map(Record::User).collect()),
        TableKind::Tasks => query_rows(conn, sql, params, parse_task_row)
            .map(|rows| rows.into_iter().map(Record::Task).collect()),
        TableKind::TaskDeliverableLinks => query_rows(conn, sql, params, parse_link_row)
            .map(|rows| rows.into_iter().map(Record::TaskDeliverableLink).collect()),
    }
}

fn query_rows<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse(row)?);
    }
    Ok(items)
}

fn parse_partner_row(row: &Row<'_>) -> rusqlite::Result<Partner> {
    Ok(Partner {
        id: row.get("id")?,
        name: row.get("name")?,
        country: row.get("country")?,
        role: row.get("role")?,
    })
}

fn parse_work_package_row(row: &Row<'_>) -> rusqlite::Result<WorkPackage> {
    Ok(WorkPackage {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
    })
}

fn parse_deliverable_row(row: &Row<'_>) -> rusqlite::Result<Deliverable> {
    Ok(Deliverable {
        id: row.get("id")?,
        code: row.get("code")?,
        work_package: row.get("work_package")?,
        description: row.get("description")?,
        responsible_partner: row.get("responsible_partner")?,
        month_due: row.get("month_due")?,
        progress: row.get("progress")?,
        percent: row.get("percent")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        code: row.get("code")?,
        description: row.get("description")?,
        responsible_partner: row.get("responsible_partner")?,
        month_due: row.get("month_due")?,
        progress: row.get("progress")?,
        percent: row.get("percent")?,
    })
}

fn parse_link_row(row: &Row<'_>) -> rusqlite::Result<TaskDeliverableLink> {
    Ok(TaskDeliverableLink {
        id: row.get("id")?,
        task: row.get("task")?,
        deliverable: row.get("deliverable")?,
    })
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
    })
}
