#![allow(dead_code)]

use rusqlite::Connection;
use swiftdb_core::{
    FormData, GrantKind, GrantRepository, LeadService, RecordId, RecordService, RequestContext,
    Session, Sha256PasswordHasher, SqliteGrantRepository, SqliteRecordRepository,
    SqliteUserRepository, TableKind, ADMIN_USERNAME,
};

pub const LEAD_USERNAME: &str = "wplead";
pub const LEAD_PASSWORD: &str = "Passw0rdOK";

/// Ids of the rows created by [`seed`].
pub struct Seed {
    pub leeds: RecordId,
    pub kumasi: RecordId,
    pub wp_c1: RecordId,
    pub wp_c2: RecordId,
    pub d_c1: RecordId,
    pub d_c2: RecordId,
    pub t_c1: RecordId,
    pub t_c2: RecordId,
    pub lead: RecordId,
}

pub fn hasher() -> Sha256PasswordHasher {
    Sha256PasswordHasher::with_rounds(1_000)
}

pub fn admin_ctx() -> RequestContext {
    RequestContext::for_session(&Session::new(ADMIN_USERNAME))
}

pub fn user_ctx(username: &str) -> RequestContext {
    RequestContext::for_session(&Session::new(username))
}

pub fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn record_service(
    conn: &Connection,
) -> RecordService<SqliteRecordRepository<'_>, SqliteUserRepository<'_>, Sha256PasswordHasher> {
    RecordService::new(
        SqliteRecordRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
        hasher(),
    )
}

pub fn lead_service(
    conn: &Connection,
) -> LeadService<SqliteRecordRepository<'_>, SqliteGrantRepository<'_>, SqliteUserRepository<'_>> {
    LeadService::new(
        SqliteRecordRepository::try_new(conn).unwrap(),
        SqliteGrantRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
    )
}

/// Writes a grant row directly, bypassing the access form.
pub fn grant(conn: &Connection, kind: GrantKind, username: &str, value: &str) {
    SqliteGrantRepository::try_new(conn)
        .unwrap()
        .insert_grant(kind, username, value)
        .unwrap();
}

pub fn create(conn: &Connection, kind: TableKind, pairs: &[(&str, &str)]) -> RecordId {
    record_service(conn)
        .create_from_form(&mut admin_ctx(), kind, &form(pairs))
        .unwrap()
}

/// Two partners, two work packages with one deliverable and one task each,
/// and one account without grants.
///
/// T-C1.1 is linked to both deliverables; T-C2.1 only to D-C2.1.
pub fn seed(conn: &Connection) -> Seed {
    let leeds = create(conn, TableKind::Partners, &[("name", "Leeds"), ("country", "UK")]);
    let kumasi = create(conn, TableKind::Partners, &[("name", "Kumasi"), ("country", "Ghana")]);
    let wp_c1 = create(conn, TableKind::WorkPackages, &[("code", "WP-C1"), ("name", "Training")]);
    let wp_c2 = create(conn, TableKind::WorkPackages, &[("code", "WP-C2"), ("name", "Nowcasting")]);
    let d_c1 = create(
        conn,
        TableKind::Deliverables,
        &[
            ("code", "D-C1.1"),
            ("work_package", "WP-C1"),
            ("description", "Training plan"),
            ("responsible_partner", "Leeds"),
            ("month_due", "10"),
            ("percent", "0"),
        ],
    );
    let d_c2 = create(
        conn,
        TableKind::Deliverables,
        &[
            ("code", "D-C2.1"),
            ("work_package", "WP-C2"),
            ("description", "Nowcasting report"),
            ("responsible_partner", "Kumasi"),
            ("month_due", "24"),
            ("percent", "0"),
        ],
    );
    let t_c1 = create(
        conn,
        TableKind::Tasks,
        &[
            ("code", "T-C1.1"),
            ("description", "Run workshop"),
            ("responsible_partner", "Leeds"),
            ("month_due", "6"),
            ("percent", "0"),
        ],
    );
    let t_c2 = create(
        conn,
        TableKind::Tasks,
        &[
            ("code", "T-C2.1"),
            ("description", "Collect radar data"),
            ("responsible_partner", "Kumasi"),
            ("month_due", "12"),
            ("percent", "0"),
        ],
    );
    create(
        conn,
        TableKind::TaskDeliverableLinks,
        &[("task", "T-C1.1"), ("deliverable", "D-C1.1")],
    );
    create(
        conn,
        TableKind::TaskDeliverableLinks,
        &[("task", "T-C2.1"), ("deliverable", "D-C2.1")],
    );
    create(
        conn,
        TableKind::TaskDeliverableLinks,
        &[("task", "T-C1.1"), ("deliverable", "D-C2.1")],
    );
    let lead = create(
        conn,
        TableKind::Users,
        &[("username", LEAD_USERNAME), ("password", LEAD_PASSWORD)],
    );

    Seed {
        leeds,
        kumasi,
        wp_c1,
        wp_c2,
        d_c1,
        d_c2,
        t_c1,
        t_c2,
        lead,
    }
}
