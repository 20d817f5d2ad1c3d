mod common;

use common::{admin_ctx, grant, lead_service, seed, user_ctx, LEAD_USERNAME};
use swiftdb_core::db::open_db_in_memory;
use swiftdb_core::{DeliverableInput, GrantKind, ServiceError, TaskInput};

#[test]
fn lists_contain_only_granted_rows() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    grant(&conn, GrantKind::WorkPackage, LEAD_USERNAME, "WP-C2");
    grant(&conn, GrantKind::Partner, LEAD_USERNAME, "Leeds");
    let service = lead_service(&conn);
    let lead = user_ctx(LEAD_USERNAME);

    let codes: Vec<_> = service
        .wp_list(&lead)
        .unwrap()
        .into_iter()
        .map(|row| row.code)
        .collect();
    assert_eq!(codes, vec!["WP-C2"]);

    let names: Vec<_> = service
        .partner_list(&lead)
        .unwrap()
        .into_iter()
        .map(|row| row.name)
        .collect();
    assert_eq!(names, vec!["Leeds"]);

    assert_eq!(service.wp_list(&admin_ctx()).unwrap().len(), 2);
    assert_eq!(service.partner_list(&admin_ctx()).unwrap().len(), 2);
}

#[test]
fn work_package_summary_collects_linked_tasks() {
    let conn = open_db_in_memory().unwrap();
    let seed = seed(&conn);
    grant(&conn, GrantKind::WorkPackage, LEAD_USERNAME, "WP-C2");
    let service = lead_service(&conn);
    let lead = user_ctx(LEAD_USERNAME);

    let summary = service.wp_summary(&lead, seed.wp_c2).unwrap();
    assert_eq!(summary.work_package.code, "WP-C2");
    let deliverables: Vec<_> = summary.deliverables.iter().map(|row| row.code.as_str()).collect();
    assert_eq!(deliverables, vec!["D-C2.1"]);
    let tasks: Vec<_> = summary.tasks.iter().map(|row| row.code.as_str()).collect();
    assert_eq!(tasks, vec!["T-C1.1", "T-C2.1"]);

    assert!(matches!(
        service.wp_summary(&lead, seed.wp_c1).unwrap_err(),
        ServiceError::Forbidden
    ));
    assert!(matches!(
        service.wp_summary(&lead, 999).unwrap_err(),
        ServiceError::NotFound(_)
    ));
}

#[test]
fn partner_summary_lists_responsibilities() {
    let conn = open_db_in_memory().unwrap();
    let seed = seed(&conn);
    grant(&conn, GrantKind::Partner, LEAD_USERNAME, "Kumasi");
    let service = lead_service(&conn);
    let lead = user_ctx(LEAD_USERNAME);

    let summary = service.partner_summary(&lead, seed.kumasi).unwrap();
    assert_eq!(summary.partner.name, "Kumasi");
    assert_eq!(summary.deliverables.len(), 1);
    assert_eq!(summary.deliverables[0].code, "D-C2.1");
    assert_eq!(summary.tasks.len(), 1);
    assert_eq!(summary.tasks[0].code, "T-C2.1");

    assert!(matches!(
        service.partner_summary(&lead, seed.leeds).unwrap_err(),
        ServiceError::Forbidden
    ));
}

#[test]
fn deliverable_self_service_changes_only_progress() {
    let conn = open_db_in_memory().unwrap();
    let seed = seed(&conn);
    grant(&conn, GrantKind::WorkPackage, LEAD_USERNAME, "WP-C1");
    let service = lead_service(&conn);
    let mut lead = user_ctx(LEAD_USERNAME);

    let stored = service.deliverable_for_edit(&lead, seed.d_c1).unwrap();
    let input = DeliverableInput {
        progress: Some("Draft circulated".to_string()),
        percent: 55,
        ..DeliverableInput::from(&stored)
    };
    service.edit_deliverable(&mut lead, seed.d_c1, input).unwrap();

    let updated = service.deliverable_for_edit(&lead, seed.d_c1).unwrap();
    assert_eq!(updated.progress.as_deref(), Some("Draft circulated"));
    assert_eq!(updated.percent, 55);
    assert_eq!(updated.month_due, stored.month_due);

    let err = service
        .edit_deliverable(
            &mut lead,
            seed.d_c1,
            DeliverableInput {
                month_due: 40,
                percent: 150,
                ..DeliverableInput::from(&updated)
            },
        )
        .unwrap_err();
    match err {
        ServiceError::Validation(errors) => {
            assert_eq!(
                errors.message_for("month_due"),
                Some("This field cannot be changed")
            );
            assert_eq!(errors.message_for("percent"), Some("Must be between 0 and 100"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let other = service
        .deliverable_for_edit(&admin_ctx(), seed.d_c2)
        .unwrap();
    let err = service
        .edit_deliverable(&mut lead, seed.d_c2, DeliverableInput::from(&other))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));
}

#[test]
fn task_self_service_follows_reachable_work_packages() {
    let conn = open_db_in_memory().unwrap();
    let seed = seed(&conn);
    grant(&conn, GrantKind::WorkPackage, LEAD_USERNAME, "WP-C2");
    let service = lead_service(&conn);
    let mut lead = user_ctx(LEAD_USERNAME);

    let stored = service.task_for_edit(&lead, seed.t_c1).unwrap();
    service
        .edit_task(
            &mut lead,
            seed.t_c1,
            TaskInput {
                progress: None,
                percent: 100,
                ..TaskInput::from(&stored)
            },
        )
        .unwrap();
    assert_eq!(service.task_for_edit(&lead, seed.t_c1).unwrap().percent, 100);

    let err = service
        .edit_task(
            &mut lead,
            seed.t_c1,
            TaskInput {
                description: "Something else".to_string(),
                ..TaskInput::from(&stored)
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[test]
fn self_service_keeps_unset_work_package_unset() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    conn.execute(
        "INSERT INTO deliverables (code, work_package, description, responsible_partner, month_due, percent)
         VALUES ('D-LOOSE', NULL, 'Unassigned', 'Kumasi', 5, 0);",
        [],
    )
    .unwrap();
    let id = conn.last_insert_rowid();
    let service = lead_service(&conn);
    let mut admin = admin_ctx();

    let stored = service.deliverable_for_edit(&admin, id).unwrap();
    service
        .edit_deliverable(
            &mut admin,
            id,
            DeliverableInput {
                percent: 10,
                ..DeliverableInput::from(&stored)
            },
        )
        .unwrap();

    let updated = service.deliverable_for_edit(&admin, id).unwrap();
    assert_eq!(updated.work_package, None);
    assert_eq!(updated.percent, 10);
}

#[test]
fn blank_progress_clears_the_note_and_padding_is_not_a_change() {
    let conn = open_db_in_memory().unwrap();
    let seed = seed(&conn);
    grant(&conn, GrantKind::Partner, LEAD_USERNAME, "Leeds");
    let service = lead_service(&conn);
    let mut lead = user_ctx(LEAD_USERNAME);

    let stored = service.task_for_edit(&lead, seed.t_c1).unwrap();
    service
        .edit_task(
            &mut lead,
            seed.t_c1,
            TaskInput {
                progress: Some("Venue booked".to_string()),
                percent: 20,
                ..TaskInput::from(&stored)
            },
        )
        .unwrap();

    service
        .edit_task(
            &mut lead,
            seed.t_c1,
            TaskInput {
                code: format!(" {} ", stored.code),
                progress: Some(String::new()),
                percent: 25,
                ..TaskInput::from(&stored)
            },
        )
        .unwrap();

    let updated = service.task_for_edit(&lead, seed.t_c1).unwrap();
    assert_eq!(updated.code, "T-C1.1");
    assert_eq!(updated.progress, None);
    assert_eq!(updated.percent, 25);
}
