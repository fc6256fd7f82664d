use super::PartyKindArg;
use estatio_core::db::Connection;
use estatio_core::repo::party_repo::{PartyListQuery, PartyRepository, SqlitePartyRepository};
use estatio_core::{Party, PartyKind};

pub fn list_parties(
    conn: &Connection,
    kind: Option<PartyKindArg>,
    visible_from: Option<String>,
) -> anyhow::Result<()> {
    let repo = SqlitePartyRepository::try_new(conn)?;
    let query = PartyListQuery {
        kind: kind.map(|kind| match kind {
            PartyKindArg::Organisation => PartyKind::Organisation,
            PartyKindArg::Person => PartyKind::Person,
        }),
        visible_from,
    };

    let parties = repo.list_parties(&query)?;
    if parties.is_empty() {
        println!("no parties");
        return Ok(());
    }
    for party in parties {
        println!(
            "{:<16} {:<13} {:<6} {}",
            party.reference,
            kind_label(&party),
            party.at_path,
            party.name
        );
    }
    Ok(())
}

fn kind_label(party: &Party) -> &'static str {
    if party.is_person() {
        "person"
    } else {
        "organisation"
    }
}

#[cfg(test)]
mod tests {
    use super::kind_label;
    use estatio_core::{Party, PartyKind, PersonGender};

    fn party(kind: PartyKind) -> Party {
        Party {
            id: 1,
            reference: "GVANNELLI".to_string(),
            kind,
            name: "Vannelli, Gino".to_string(),
            at_path: "/GB".to_string(),
            initials: None,
            first_name: Some("Gino".to_string()),
            last_name: Some("Vannelli".to_string()),
            gender: Some(PersonGender::Male),
            version: 1,
        }
    }

    #[test]
    fn kind_label_follows_party_kind() {
        assert_eq!(kind_label(&party(PartyKind::Person)), "person");
        assert_eq!(kind_label(&party(PartyKind::Organisation)), "organisation");
    }
}
