//! Party fixtures and the shared routines that build organisations and
//! persons from fixture data.

use super::tenancy::ApplicationTenancyForGb;
use super::{ExecutionContext, Fixture, FixtureObject, FixtureResult};
use crate::model::party::{NewParty, Party, PersonGender};
use crate::model::relationship::RelationshipType;
use log::debug;

/// Creates (or finds) an organisation and records it.
pub fn create_organisation(
    ctx: &mut ExecutionContext<'_>,
    fixture: &dyn Fixture,
    at_path: &str,
    reference: &str,
    name: &str,
) -> FixtureResult<Party> {
    let organisation = ctx
        .party_service()?
        .find_or_create_organisation(reference, name, at_path)?;
    ctx.add_result(
        fixture,
        organisation.reference.clone(),
        FixtureObject::Party(organisation.clone()),
    );
    Ok(organisation)
}

/// Person attributes seeded by [`create_person`].
#[derive(Debug, Clone, Copy)]
pub struct PersonSpec<'a> {
    pub at_path: &'a str,
    pub reference: &'a str,
    pub initials: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: &'a str,
    pub gender: PersonGender,
    pub phone_number: Option<&'a str>,
    pub email_address: Option<&'a str>,
    /// Reference of the party on the other side of the relationship.
    pub from_party_reference: Option<&'a str>,
    /// Title of the relationship, either side (`"Contact"`, `"Contact of"`).
    pub relationship_title: Option<&'a str>,
}

/// Creates (or finds) a person with its channels and optional relationship.
///
/// Results are recorded as person, phone number, email address, relationship.
/// A relationship is only created when both its reference and title are set.
pub fn create_person(
    ctx: &mut ExecutionContext<'_>,
    fixture: &dyn Fixture,
    spec: &PersonSpec<'_>,
) -> FixtureResult<Party> {
    let service = ctx.party_service()?;

    let draft = NewParty::person(
        spec.reference,
        spec.at_path,
        spec.initials,
        spec.first_name,
        spec.last_name,
        spec.gender,
    );
    let person = service.find_or_create_person(&draft)?;
    ctx.add_result(
        fixture,
        person.reference.clone(),
        FixtureObject::Party(person.clone()),
    );

    if let Some(phone_number) = spec.phone_number {
        let channel = service.add_phone_number(&person, phone_number)?;
        ctx.add_result(
            fixture,
            format!("{}/phone", person.reference),
            FixtureObject::Channel(channel),
        );
    }
    if let Some(email_address) = spec.email_address {
        let channel = service.add_email_address(&person, email_address)?;
        ctx.add_result(
            fixture,
            format!("{}/email", person.reference),
            FixtureObject::Channel(channel),
        );
    }

    match (spec.from_party_reference, spec.relationship_title) {
        (Some(from_reference), Some(title)) => {
            let relationship = service.relate_by_title(from_reference, &person, title)?;
            ctx.add_result(
                fixture,
                format!("{from_reference}->{}", person.reference),
                FixtureObject::Relationship(relationship),
            );
        }
        (None, None) => {}
        _ => debug!(
            "event=fixture_relationship module=fixture status=skipped fixture={} reference={}",
            fixture.name(),
            person.reference
        ),
    }

    Ok(person)
}

/// Seeds the TOPMODEL organisation in `/GB`.
pub struct OrganisationForTopModelGb;

impl OrganisationForTopModelGb {
    pub const REF: &'static str = "TOPMODEL";
    pub const NAME: &'static str = "Topmodel Fashion";
    pub const AT_PATH: &'static str = ApplicationTenancyForGb::PATH;
}

impl Fixture for OrganisationForTopModelGb {
    fn name(&self) -> &'static str {
        "organisation-topmodel-gb"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        ctx.execute_child(self, &ApplicationTenancyForGb)?;
        create_organisation(ctx, self, Self::AT_PATH, Self::REF, Self::NAME)?;
        Ok(())
    }
}

/// Seeds the HELLOWORLD_GB organisation in `/GB`.
pub struct OrganisationForHelloWorldGb;

impl OrganisationForHelloWorldGb {
    pub const REF: &'static str = "HELLOWORLD_GB";
    pub const NAME: &'static str = "Hello World Properties";
    pub const AT_PATH: &'static str = ApplicationTenancyForGb::PATH;
}

impl Fixture for OrganisationForHelloWorldGb {
    fn name(&self) -> &'static str {
        "organisation-helloworld-gb"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        ctx.execute_child(self, &ApplicationTenancyForGb)?;
        create_organisation(ctx, self, Self::AT_PATH, Self::REF, Self::NAME)?;
        Ok(())
    }
}

/// Seeds Gino Vannelli as a contact of TOPMODEL.
pub struct PersonForGinoVannelliGb;

impl PersonForGinoVannelliGb {
    pub const REF: &'static str = "GVANNELLI";
    pub const AT_PATH: &'static str = ApplicationTenancyForGb::PATH;
    pub const PARTY_REF_FROM: &'static str = OrganisationForTopModelGb::REF;
}

impl Fixture for PersonForGinoVannelliGb {
    fn name(&self) -> &'static str {
        "person-gino-vannelli-gb"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        ctx.execute_child(self, &OrganisationForTopModelGb)?;
        create_person(
            ctx,
            self,
            &PersonSpec {
                at_path: Self::AT_PATH,
                reference: Self::REF,
                initials: Some("G"),
                first_name: Some("Gino"),
                last_name: "Vannelli",
                gender: PersonGender::Male,
                phone_number: None,
                email_address: None,
                from_party_reference: Some(Self::PARTY_REF_FROM),
                relationship_title: Some(RelationshipType::Contact.from_title()),
            },
        )?;
        Ok(())
    }
}
