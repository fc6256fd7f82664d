use estatio_core::db::open_db_in_memory;
use estatio_core::model::relationship::NewRelationship;
use estatio_core::model::tenancy::NewTenancy;
use estatio_core::repo::party_repo::SqlitePartyRepository;
use estatio_core::repo::relationship_repo::{
    RelationshipRepository, SqliteRelationshipRepository,
};
use estatio_core::repo::tenancy_repo::{SqliteTenancyRepository, TenancyRepository};
use estatio_core::{
    NewParty, Party, PartyService, PartyServiceError, PersonGender, RelationshipType, RepoError,
    ValidationError,
};
use rusqlite::Connection;

type Service<'conn> =
    PartyService<SqlitePartyRepository<'conn>, SqliteRelationshipRepository<'conn>>;

fn service(conn: &Connection) -> Service<'_> {
    let tenancies = SqliteTenancyRepository::try_new(conn).unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/", "Global", None))
        .unwrap();
    tenancies
        .find_or_create(&NewTenancy::new("/GB", "Great Britain", Some("/")))
        .unwrap();
    PartyService::new(
        SqlitePartyRepository::try_new(conn).unwrap(),
        SqliteRelationshipRepository::try_new(conn).unwrap(),
    )
}

fn gino(service: &Service<'_>) -> Party {
    service
        .find_or_create_person(&NewParty::person(
            "GVANNELLI",
            "/GB",
            Some("G"),
            Some("Gino"),
            "Vannelli",
            PersonGender::Male,
        ))
        .unwrap()
}

fn count_relationships(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM party_relationships;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn from_title_links_from_party_to_person() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let topmodel = service
        .find_or_create_organisation("TOPMODEL", "Topmodel", "/GB")
        .unwrap();
    let person = gino(&service);

    let relationship = service
        .relate_by_title("TOPMODEL", &person, "Contact")
        .unwrap();

    assert_eq!(relationship.kind, RelationshipType::Contact);
    assert_eq!(relationship.from_party_id, topmodel.id);
    assert_eq!(relationship.to_party_id, person.id);
}

#[test]
fn to_title_swaps_the_parties() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let topmodel = service
        .find_or_create_organisation("TOPMODEL", "Topmodel", "/GB")
        .unwrap();
    let person = gino(&service);

    let relationship = service
        .relate_by_title("TOPMODEL", &person, "Employee")
        .unwrap();

    assert_eq!(relationship.kind, RelationshipType::Employment);
    assert_eq!(relationship.from_party_id, person.id);
    assert_eq!(relationship.to_party_id, topmodel.id);
}

#[test]
fn relating_twice_keeps_one_relationship() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service
        .find_or_create_organisation("TOPMODEL", "Topmodel", "/GB")
        .unwrap();
    let person = gino(&service);

    let first = service
        .relate_by_title("TOPMODEL", &person, "Contact")
        .unwrap();
    let second = service
        .relate_by_title("TOPMODEL", &person, "contact")
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(count_relationships(&conn), 1);
    assert_eq!(service.relationships_of(&person).unwrap(), vec![first]);
}

#[test]
fn unknown_title_fails_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let person = gino(&service);

    let err = service
        .relate_by_title("TOPMODEL", &person, "Landlord")
        .unwrap_err();
    assert!(matches!(err, PartyServiceError::UnknownRelationshipTitle(ref title) if title == "Landlord"));
    assert_eq!(count_relationships(&conn), 0);
}

#[test]
fn unknown_from_party_is_reported_by_reference() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let person = gino(&service);

    let err = service
        .relate_by_title("NOBODY", &person, "Contact")
        .unwrap_err();
    assert!(matches!(err, PartyServiceError::PartyNotFound(ref reference) if reference == "NOBODY"));
}

#[test]
fn party_cannot_relate_to_itself() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let person = gino(&service);

    let err = service
        .relate_by_title("GVANNELLI", &person, "Contact")
        .unwrap_err();
    assert!(matches!(
        err,
        PartyServiceError::Repo(RepoError::Validation(ValidationError::SelfRelationship))
    ));
}

#[test]
fn relationship_update_is_versioned() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let topmodel = service
        .find_or_create_organisation("TOPMODEL", "Topmodel", "/GB")
        .unwrap();
    let person = gino(&service);
    let repo = SqliteRelationshipRepository::try_new(&conn).unwrap();

    let created = repo
        .find_or_create(&NewRelationship::new(
            RelationshipType::Contact,
            topmodel.id,
            person.id,
        ))
        .unwrap();
    let mut first_copy = created.clone();
    let mut stale_copy = created.clone();

    first_copy.description = Some("Account manager".to_string());
    repo.update_relationship(&mut first_copy).unwrap();
    assert_eq!(first_copy.version, 2);

    stale_copy.description = Some("Buyer".to_string());
    assert!(matches!(
        repo.update_relationship(&mut stale_copy).unwrap_err(),
        RepoError::OptimisticLock { .. }
    ));

    let stored = repo
        .find(RelationshipType::Contact, topmodel.id, person.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.description.as_deref(), Some("Account manager"));
}

#[test]
fn channels_are_attached_through_the_service() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let person = gino(&service);

    service
        .add_phone_number(&person, "+44 20 7946 0000")
        .unwrap();
    service
        .add_email_address(&person, " gino@topmodel.example ")
        .unwrap();
    service
        .add_email_address(&person, "gino@topmodel.example")
        .unwrap();

    let values: Vec<_> = service
        .channels(&person)
        .unwrap()
        .into_iter()
        .map(|channel| channel.value)
        .collect();
    assert_eq!(values, ["gino@topmodel.example", "+44 20 7946 0000"]);
}
