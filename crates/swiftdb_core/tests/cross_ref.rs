mod common;

use common::{create, seed};
use swiftdb_core::db::open_db_in_memory;
use swiftdb_core::{CrossRefResolver, SqliteRecordRepository, TableKind};

#[test]
fn tasks_follow_deliverable_and_link_order() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let resolver = CrossRefResolver::new(SqliteRecordRepository::try_new(&conn).unwrap());

    assert_eq!(resolver.tasks_for_work_package("WP-C1").unwrap(), vec!["T-C1.1"]);
    assert_eq!(
        resolver.tasks_for_work_package("WP-C2").unwrap(),
        vec!["T-C2.1", "T-C1.1"]
    );
    assert!(resolver.tasks_for_work_package("WP-NONE").unwrap().is_empty());

    assert_eq!(
        resolver.work_packages_for_task("T-C1.1").unwrap(),
        vec![Some("WP-C1".to_string()), Some("WP-C2".to_string())]
    );
}

#[test]
fn repeated_links_are_reported_once() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    create(
        &conn,
        TableKind::TaskDeliverableLinks,
        &[("task", "T-C1.1"), ("deliverable", "D-C1.1")],
    );
    let resolver = CrossRefResolver::new(SqliteRecordRepository::try_new(&conn).unwrap());

    assert_eq!(resolver.tasks_for_work_package("WP-C1").unwrap(), vec!["T-C1.1"]);
    assert_eq!(
        resolver.work_packages_for_task("T-C1.1").unwrap(),
        vec![Some("WP-C1".to_string()), Some("WP-C2".to_string())]
    );
}

#[test]
fn membership_is_mutual() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let resolver = CrossRefResolver::new(SqliteRecordRepository::try_new(&conn).unwrap());

    for work_package in ["WP-C1", "WP-C2"] {
        for task in resolver.tasks_for_work_package(work_package).unwrap() {
            let reached = resolver.work_packages_for_task(&task).unwrap();
            assert!(
                reached.contains(&Some(work_package.to_string())),
                "{task} does not reach {work_package}"
            );
        }
    }
}

#[test]
fn unassigned_or_missing_deliverables_resolve_to_none() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    conn.execute_batch(
        "INSERT INTO deliverables (code, work_package, description, responsible_partner, month_due, percent)
         VALUES ('D-LOOSE', NULL, 'Unassigned', 'Kumasi', 5, 0);
         INSERT INTO tasks2deliverables (task, deliverable) VALUES ('T-C2.1', 'D-LOOSE');
         INSERT INTO tasks2deliverables (task, deliverable) VALUES ('T-C2.1', 'D-DELETED');",
    )
    .unwrap();
    let resolver = CrossRefResolver::new(SqliteRecordRepository::try_new(&conn).unwrap());

    assert_eq!(
        resolver.work_packages_for_task("T-C2.1").unwrap(),
        vec![Some("WP-C2".to_string()), None]
    );
    assert!(resolver.work_packages_for_task("T-NONE").unwrap().is_empty());
}
