use estatio_core::db::migrations::{current_user_version, latest_version};
use estatio_core::db::open_db;
use estatio_core::model::tenancy::NewTenancy;
use estatio_core::repo::party_repo::{PartyRepository, SqlitePartyRepository};
use estatio_core::repo::tenancy_repo::{SqliteTenancyRepository, TenancyRepository};
use estatio_core::NewParty;
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 8;

#[test]
fn concurrent_find_or_create_yields_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("estatio.db");

    let conn = open_db(&path).unwrap();
    let tenancies = SqliteTenancyRepository::try_new(&conn).unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/", "Global", None))
        .unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/GB", "Great Britain", Some("/")))
        .unwrap();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let repo = SqlitePartyRepository::try_new(&conn).unwrap();
                let draft = NewParty::organisation("TOPMODEL", format!("Writer {writer}"), "/GB");
                barrier.wait();
                if writer % 2 == 0 {
                    repo.find_or_create(&draft).unwrap()
                } else {
                    repo.create_or_find(&draft).unwrap()
                }
            })
        })
        .collect();

    let parties: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let first = &parties[0];
    for party in &parties {
        assert_eq!(party.id, first.id);
        assert_eq!(party.name, first.name);
    }
    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM parties WHERE reference = 'TOPMODEL';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn concurrent_opens_of_a_fresh_file_migrate_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let conn = open_db(&path).unwrap();
                current_user_version(&conn).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), latest_version());
    }

    let conn = open_db(&path).unwrap();
    let tenancies = SqliteTenancyRepository::try_new(&conn).unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/", "Global", None))
        .unwrap();
}
