use chrono::NaiveDate;
use estatio_core::db::open_db_in_memory;
use estatio_core::model::reference::{NewReference, ReferenceEntity, ReferenceKind};
use estatio_core::model::tenancy::NewTenancy;
use estatio_core::repo::order_item_repo::{OrderItemRepository, SqliteOrderItemRepository};
use estatio_core::repo::order_repo::{OrderListQuery, OrderRepository, SqliteOrderRepository};
use estatio_core::repo::party_repo::{PartyRepository, SqlitePartyRepository};
use estatio_core::repo::reference_repo::{ReferenceRepository, SqliteReferenceRepository};
use estatio_core::repo::tenancy_repo::{SqliteTenancyRepository, TenancyRepository};
use estatio_core::{
    NewOrder, NewParty, OrderItemLine, OrderService, Party, RepoError, ValidationError,
};
use rust_decimal::Decimal;
use rusqlite::Connection;
use std::str::FromStr;

type Service<'conn> = OrderService<
    SqliteOrderRepository<'conn>,
    SqliteOrderItemRepository<'conn>,
    SqliteTenancyRepository<'conn>,
>;

struct Seeded {
    supplier: Party,
    buyer: Party,
    charge: ReferenceEntity,
    tax: ReferenceEntity,
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn setup(conn: &Connection) -> Seeded {
    let tenancies = SqliteTenancyRepository::try_new(conn).unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/", "Global", None))
        .unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/GB", "Great Britain", Some("/")))
        .unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/NL", "Netherlands", Some("/")))
        .unwrap();

    let parties = SqlitePartyRepository::try_new(conn).unwrap();
    let supplier = parties
        .find_or_create(&NewParty::organisation("TOPMODEL", "Topmodel", "/GB"))
        .unwrap();
    let buyer = parties
        .find_or_create(&NewParty::organisation("HELLOWORLD_GB", "Hello World", "/GB"))
        .unwrap();

    let references = SqliteReferenceRepository::try_new(conn).unwrap();
    let charge = references
        .find_or_create(&NewReference::new(ReferenceKind::Charge, "WORKS", "Works", "/GB"))
        .unwrap();
    let tax = references
        .find_or_create(&NewReference::new(ReferenceKind::Tax, "VATSTD_GB", "VAT", "/GB"))
        .unwrap();

    Seeded {
        supplier,
        buyer,
        charge,
        tax,
    }
}

fn service(conn: &Connection) -> Service<'_> {
    OrderService::new(
        SqliteOrderRepository::try_new(conn).unwrap(),
        SqliteOrderItemRepository::try_new(conn).unwrap(),
        SqliteTenancyRepository::try_new(conn).unwrap(),
    )
}

fn draft(fixture: &Seeded, order_number: &str) -> NewOrder {
    NewOrder::new(
        order_number,
        date(2016, 1, 1),
        fixture.supplier.id,
        fixture.buyer.id,
        "/GB",
    )
}

fn line(fixture: &Seeded, description: &str, net: &str) -> OrderItemLine {
    let mut line = OrderItemLine::new(fixture.charge.id, description);
    line.net_amount = Some(Decimal::from_str(net).unwrap());
    line.tax_id = Some(fixture.tax.id);
    line
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn find_or_create_order_returns_existing_order_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);

    let mut first_draft = draft(&fixture, "2016-0001");
    first_draft.supplier_reference = Some("TM-17".to_string());
    let first = service.find_or_create_order(&first_draft).unwrap();

    let mut second_draft = draft(&fixture, "2016-0001");
    second_draft.supplier_reference = Some("TM-99".to_string());
    second_draft.entry_date = date(2017, 6, 1);
    let second = service.find_or_create_order(&second_draft).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.supplier_reference.as_deref(), Some("TM-17"));
    assert_eq!(second.entry_date, date(2016, 1, 1));
    assert_eq!(count(&conn, "orders"), 1);
}

#[test]
fn order_number_lookup_is_exact_and_case_sensitive() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);
    service
        .find_or_create_order(&draft(&fixture, "PO-A1"))
        .unwrap();

    assert!(service.find_order("PO-A1").unwrap().is_some());
    assert!(service.find_order("po-a1").unwrap().is_none());
    assert!(service.find_order("PO-A").unwrap().is_none());
}

#[test]
fn blank_order_number_fails_before_any_sql() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);

    let err = service
        .find_or_create_order(&draft(&fixture, "   "))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingField("order_number"))
    ));
    assert_eq!(count(&conn, "orders"), 0);
}

#[test]
fn unknown_supplier_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);

    let mut order = draft(&fixture, "2016-0002");
    order.supplier_id = 9_999;
    let err = service.find_or_create_order(&order).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "party", ref key } if key == "9999"));
}

#[test]
fn concurrent_edits_from_same_version_fail_with_optimistic_lock() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);
    let repo = SqliteOrderRepository::try_new(&conn).unwrap();

    let order = service
        .find_or_create_order(&draft(&fixture, "2016-0003"))
        .unwrap();
    let mut first_copy = order.clone();
    let mut second_copy = order.clone();

    first_copy.order_date = Some(date(2016, 1, 5));
    repo.update_order(&mut first_copy).unwrap();
    assert_eq!(first_copy.version, 2);

    second_copy.supplier_reference = Some("late edit".to_string());
    let err = repo.update_order(&mut second_copy).unwrap_err();
    assert!(matches!(
        err,
        RepoError::OptimisticLock {
            entity: "order",
            expected_version: 1,
            ..
        }
    ));

    let stored = service.find_order("2016-0003").unwrap().unwrap();
    assert_eq!(stored.order_date, Some(date(2016, 1, 5)));
    assert_eq!(stored.supplier_reference, None);
    assert_eq!(stored.version, 2);
}

#[test]
fn approve_bumps_version_and_restores_order_on_conflict() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);

    let mut order = service
        .find_or_create_order(&draft(&fixture, "2016-0004"))
        .unwrap();
    let mut stale = order.clone();

    service
        .approve(&mut order, "jdoe", date(2016, 2, 1))
        .unwrap();
    assert!(order.is_approved());
    assert_eq!(order.version, 2);

    let err = service
        .approve(&mut stale, "someone-else", date(2016, 2, 2))
        .unwrap_err();
    assert!(matches!(err, RepoError::OptimisticLock { .. }));
    assert_eq!(stale.approved_by, None);
    assert_eq!(stale.approved_on, None);
    assert_eq!(stale.version, 1);

    let stored = service.find_order("2016-0004").unwrap().unwrap();
    assert_eq!(stored.approved_by.as_deref(), Some("jdoe"));
    assert_eq!(stored.approved_on, Some(date(2016, 2, 1)));
}

#[test]
fn adding_identical_item_twice_keeps_one_row() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);
    let order = service
        .find_or_create_order(&draft(&fixture, "2016-0005"))
        .unwrap();

    let first = service
        .add_item(&order, &line(&fixture, "Refurbishment", "100.00"))
        .unwrap();
    let second = service
        .add_item(&order, &line(&fixture, "Refurbishment", "100.0"))
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.order_id, order.id);
    assert_eq!(count(&conn, "order_items"), 1);
}

#[test]
fn items_differing_in_any_field_are_distinct() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);
    let order = service
        .find_or_create_order(&draft(&fixture, "2016-0006"))
        .unwrap();

    let base = line(&fixture, "Refurbishment", "100.00");
    let mut other_amount = base.clone();
    other_amount.net_amount = Some(Decimal::from_str("100.01").unwrap());
    let mut no_tax = base.clone();
    no_tax.tax_id = None;
    let mut dated = base.clone();
    dated.start_date = Some(date(2016, 1, 1));

    for candidate in [&base, &other_amount, &no_tax, &dated] {
        service.add_item(&order, candidate).unwrap();
    }

    let items = SqliteOrderItemRepository::try_new(&conn)
        .unwrap()
        .list_for_order(order.id)
        .unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[1].line.net_amount, Some(Decimal::from_str("100.01").unwrap()));
}

#[test]
fn add_item_does_not_refresh_a_loaded_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);
    service
        .find_or_create_order(&draft(&fixture, "2016-0007"))
        .unwrap();

    let snapshot = service.order_detail("2016-0007").unwrap().unwrap();
    assert!(snapshot.items.is_empty());

    let added = snapshot
        .order
        .add_item(
            &SqliteOrderItemRepository::try_new(&conn).unwrap(),
            &line(&fixture, "Fee", "50"),
        )
        .unwrap();

    assert!(snapshot.items.is_empty());
    let reloaded = service.order_detail("2016-0007").unwrap().unwrap();
    assert_eq!(reloaded.items, vec![added]);
}

#[test]
fn item_with_end_before_start_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);
    let order = service
        .find_or_create_order(&draft(&fixture, "2016-0008"))
        .unwrap();

    let mut bad = line(&fixture, "Works", "10");
    bad.start_date = Some(date(2016, 12, 31));
    bad.end_date = Some(date(2016, 1, 1));
    assert!(matches!(
        service.add_item(&order, &bad).unwrap_err(),
        RepoError::Validation(ValidationError::InvalidDateRange { .. })
    ));

    let mut unknown_project = line(&fixture, "Works", "10");
    unknown_project.project_id = Some(4_242);
    assert!(matches!(
        service.add_item(&order, &unknown_project).unwrap_err(),
        RepoError::NotFound { entity: "project", .. }
    ));
    assert_eq!(count(&conn, "order_items"), 0);
}

#[test]
fn deleting_an_order_removes_its_items() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);
    let repo = SqliteOrderRepository::try_new(&conn).unwrap();
    let order = service
        .find_or_create_order(&draft(&fixture, "2016-0009"))
        .unwrap();
    service
        .add_item(&order, &line(&fixture, "One", "1"))
        .unwrap();
    service
        .add_item(&order, &line(&fixture, "Two", "2"))
        .unwrap();

    repo.delete_order(order.id).unwrap();

    assert_eq!(count(&conn, "order_items"), 0);
    assert!(matches!(
        repo.delete_order(order.id).unwrap_err(),
        RepoError::NotFound { entity: "order", .. }
    ));
}

#[test]
fn orders_are_listed_by_tenancy_and_resolve_their_tenancy() {
    let conn = open_db_in_memory().unwrap();
    let fixture = setup(&conn);
    let service = service(&conn);

    let gb = service
        .find_or_create_order(&draft(&fixture, "GB-1"))
        .unwrap();
    let mut nl_draft = draft(&fixture, "NL-1");
    nl_draft.at_path = "/NL".to_string();
    service.find_or_create_order(&nl_draft).unwrap();

    let visible_from_gb = service
        .list_orders(&OrderListQuery {
            visible_from: Some("/GB".to_string()),
            ..OrderListQuery::default()
        })
        .unwrap();
    assert_eq!(visible_from_gb, vec![gb.clone()]);

    let from_root = service
        .list_orders(&OrderListQuery {
            visible_from: Some("/".to_string()),
            ..OrderListQuery::default()
        })
        .unwrap();
    assert_eq!(from_root.len(), 2);

    let paged = service
        .list_orders(&OrderListQuery {
            limit: Some(1),
            offset: 1,
            ..OrderListQuery::default()
        })
        .unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].order_number, "NL-1");

    let tenancy = service.application_tenancy(&gb).unwrap();
    assert_eq!(tenancy.path, "/GB");
    assert!(tenancy.can_see(&gb.at_path));
}
