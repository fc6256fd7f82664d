//! Capex fixtures: reference data, a demo order and the full demo seed.

use super::party::{
    OrganisationForHelloWorldGb, OrganisationForTopModelGb, PersonForGinoVannelliGb,
};
use super::tenancy::ApplicationTenancyForGb;
use super::{ExecutionContext, Fixture, FixtureObject, FixtureResult};
use crate::model::order::{NewOrder, OrderItemLine};
use crate::model::reference::{NewReference, ReferenceEntity, ReferenceKind};
use crate::repo::reference_repo::ReferenceRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn fixture_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Seeds one charge, tax, property and project in `/GB`.
pub struct CapexReferenceDataForGb;

impl CapexReferenceDataForGb {
    pub const AT_PATH: &'static str = ApplicationTenancyForGb::PATH;
    pub const CHARGE_REF: &'static str = "WORKS";
    pub const TAX_REF: &'static str = "VATSTD_GB";
    pub const PROPERTY_REF: &'static str = "OXF";
    pub const PROJECT_REF: &'static str = "OXF-02";

    const ROWS: [(ReferenceKind, &'static str, &'static str); 4] = [
        (ReferenceKind::Charge, Self::CHARGE_REF, "Works"),
        (ReferenceKind::Tax, Self::TAX_REF, "Value added tax (standard)"),
        (ReferenceKind::Property, Self::PROPERTY_REF, "Oxford Super Mall"),
        (ReferenceKind::Project, Self::PROJECT_REF, "Redevelopment Oxford"),
    ];
}

impl Fixture for CapexReferenceDataForGb {
    fn name(&self) -> &'static str {
        "capex-reference-data-gb"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        ctx.execute_child(self, &ApplicationTenancyForGb)?;
        let references = ctx.references()?;
        for (kind, reference, name) in Self::ROWS {
            let entity = references.find_or_create(&NewReference::new(
                kind,
                reference,
                name,
                Self::AT_PATH,
            ))?;
            ctx.add_result(
                self,
                format!("{}/{}", kind.entity(), entity.reference),
                FixtureObject::Reference(entity),
            );
        }
        Ok(())
    }
}

/// Seeds a capex order from TOPMODEL to HELLOWORLD_GB with two items.
pub struct OrderForTopModelGb;

impl OrderForTopModelGb {
    pub const ORDER_NUMBER: &'static str = "2016-0001";
    pub const AT_PATH: &'static str = ApplicationTenancyForGb::PATH;
    pub const SUPPLIER_REF: &'static str = OrganisationForTopModelGb::REF;
    pub const BUYER_REF: &'static str = OrganisationForHelloWorldGb::REF;
}

impl Fixture for OrderForTopModelGb {
    fn name(&self) -> &'static str {
        "order-topmodel-gb"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        ctx.execute_child(self, &OrganisationForTopModelGb)?;
        ctx.execute_child(self, &OrganisationForHelloWorldGb)?;
        ctx.execute_child(self, &CapexReferenceDataForGb)?;

        let parties = ctx.party_service()?;
        let supplier = parties.find_party(Self::SUPPLIER_REF)?;
        let buyer = parties.find_party(Self::BUYER_REF)?;

        let references = ctx.references()?;
        let lookup = |kind: ReferenceKind, reference: &str| -> FixtureResult<ReferenceEntity> {
            references
                .find_by_reference(kind, reference)?
                .ok_or_else(|| RepoError::not_found(kind.entity(), reference).into())
        };
        let charge = lookup(ReferenceKind::Charge, CapexReferenceDataForGb::CHARGE_REF)?;
        let tax = lookup(ReferenceKind::Tax, CapexReferenceDataForGb::TAX_REF)?;
        let property = lookup(ReferenceKind::Property, CapexReferenceDataForGb::PROPERTY_REF)?;
        let project = lookup(ReferenceKind::Project, CapexReferenceDataForGb::PROJECT_REF)?;

        let mut draft = NewOrder::new(
            Self::ORDER_NUMBER,
            fixture_date(2016, 1, 1),
            supplier.id,
            buyer.id,
            Self::AT_PATH,
        );
        draft.supplier_reference = Some("TM-2016-17".to_string());
        draft.order_date = Some(fixture_date(2016, 1, 5));

        let orders = ctx.order_service()?;
        let order = orders.find_or_create_order(&draft)?;
        ctx.add_result(
            self,
            order.order_number.clone(),
            FixtureObject::Order(order.clone()),
        );

        let lines = [
            ("Refurbishment of unit 12", 1_000_000, 200_000),
            ("Project management fee", 50_000, 10_000),
        ];
        for (position, (description, net_cents, vat_cents)) in lines.into_iter().enumerate() {
            let mut line = OrderItemLine::new(charge.id, description);
            line.net_amount = Some(Decimal::new(net_cents, 2));
            line.vat_amount = Some(Decimal::new(vat_cents, 2));
            line.gross_amount = Some(Decimal::new(net_cents + vat_cents, 2));
            line.tax_id = Some(tax.id);
            line.start_date = Some(fixture_date(2016, 1, 1));
            line.end_date = Some(fixture_date(2016, 12, 31));
            line.property_id = Some(property.id);
            line.project_id = Some(project.id);

            let item = orders.add_item(&order, &line)?;
            ctx.add_result(
                self,
                format!("{}/{}", order.order_number, position + 1),
                FixtureObject::OrderItem(item),
            );
        }
        Ok(())
    }
}

/// Runs every demo fixture.
pub struct DemoFixture;

impl Fixture for DemoFixture {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> FixtureResult<()> {
        ctx.execute_child(self, &PersonForGinoVannelliGb)?;
        ctx.execute_child(self, &OrderForTopModelGb)
    }
}
