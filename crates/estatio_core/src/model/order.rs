//! Capex order and order item model.
//!
//! # Responsibility
//! - Define the purchase order entity and its owned item lines.
//! - Provide `Order::add_item`, which delegates to the item repository.
//!
//! # Invariants
//! - `order_number` is the natural key and is unique across all orders.
//! - Every item points back to exactly one order; the order keeps no
//!   authoritative item list of its own.
//! - Items matching on every line field are the same item.

use crate::model::party::PartyId;
use crate::model::reference::ReferenceId;
use crate::model::validation::{check_date_range, require, require_path, ValidationError};
use crate::repo::order_item_repo::OrderItemRepository;
use crate::repo::RepoResult;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub type OrderId = i64;
pub type OrderItemId = i64;

/// Persisted capex order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub supplier_reference: Option<String>,
    pub entry_date: NaiveDate,
    pub order_date: Option<NaiveDate>,
    pub supplier_id: PartyId,
    pub buyer_id: PartyId,
    pub at_path: String,
    pub approved_by: Option<String>,
    pub approved_on: Option<NaiveDate>,
    pub version: i64,
}

impl Order {
    /// Appends an item line through the item repository.
    ///
    /// Find-or-create semantics: an identical line returns the existing item.
    /// Nothing held in memory is updated, so an [`OrderDetail`] loaded before
    /// this call still lists the old items until it is reloaded.
    pub fn add_item<R: OrderItemRepository + ?Sized>(
        &self,
        items: &R,
        line: &OrderItemLine,
    ) -> RepoResult<OrderItem> {
        items.find_or_create(self, line)
    }

    pub fn is_approved(&self) -> bool {
        self.approved_by.is_some()
    }
}

/// Draft for `OrderRepository::find_or_create`.
///
/// Every attribute is supplied at once; optional ones may stay `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub supplier_reference: Option<String>,
    pub entry_date: NaiveDate,
    pub order_date: Option<NaiveDate>,
    pub supplier_id: PartyId,
    pub buyer_id: PartyId,
    pub at_path: String,
    pub approved_by: Option<String>,
    pub approved_on: Option<NaiveDate>,
}

impl NewOrder {
    /// Starts a draft with the required attributes; optional ones are `None`.
    pub fn new(
        order_number: impl Into<String>,
        entry_date: NaiveDate,
        supplier_id: PartyId,
        buyer_id: PartyId,
        at_path: impl Into<String>,
    ) -> Self {
        Self {
            order_number: order_number.into(),
            supplier_reference: None,
            entry_date,
            order_date: None,
            supplier_id,
            buyer_id,
            at_path: at_path.into(),
            approved_by: None,
            approved_on: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("order_number", &self.order_number)?;
        require_path("at_path", &self.at_path)?;
        if let Some(supplier_reference) = self.supplier_reference.as_deref() {
            require("supplier_reference", supplier_reference)?;
        }
        if let Some(approved_by) = self.approved_by.as_deref() {
            require("approved_by", approved_by)?;
        }
        Ok(())
    }
}

/// Persisted order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub line: OrderItemLine,
    pub version: i64,
}

/// Every matching field of an order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemLine {
    pub charge_id: ReferenceId,
    pub description: String,
    pub net_amount: Option<Decimal>,
    pub vat_amount: Option<Decimal>,
    pub gross_amount: Option<Decimal>,
    pub tax_id: Option<ReferenceId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub property_id: Option<ReferenceId>,
    pub project_id: Option<ReferenceId>,
}

impl OrderItemLine {
    pub fn new(charge_id: ReferenceId, description: impl Into<String>) -> Self {
        Self {
            charge_id,
            description: description.into(),
            net_amount: None,
            vat_amount: None,
            gross_amount: None,
            tax_id: None,
            start_date: None,
            end_date: None,
            property_id: None,
            project_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("description", &self.description)?;
        check_date_range(self.start_date, self.end_date)
    }

    /// Canonical matching key stored in `order_items.item_key`.
    ///
    /// Each component is length-prefixed so no field value can collide with
    /// a separator, and amounts are normalized so `100.0` matches `100.00`.
    pub fn item_key(&self) -> String {
        let components = [
            Some(self.charge_id.to_string()),
            Some(self.description.clone()),
            self.net_amount.map(|value| value.normalize().to_string()),
            self.vat_amount.map(|value| value.normalize().to_string()),
            self.gross_amount.map(|value| value.normalize().to_string()),
            self.tax_id.map(|value| value.to_string()),
            self.start_date.map(|value| value.to_string()),
            self.end_date.map(|value| value.to_string()),
            self.property_id.map(|value| value.to_string()),
            self.project_id.map(|value| value.to_string()),
        ];

        let mut key = String::new();
        for component in components {
            match component {
                Some(value) => {
                    let _ = write!(key, "{}:{value};", value.len());
                }
                None => key.push_str("-;"),
            }
        }
        key
    }
}

/// Order snapshot together with the items that existed when it was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}
