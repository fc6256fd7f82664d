//! Capex order use-case service.
//!
//! # Responsibility
//! - Create orders and append item lines.
//! - Load order snapshots with their items.
//! - Approve orders through versioned updates.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or version checks.
//! - An `OrderDetail` is a snapshot; later `add_item` calls do not update it.

use crate::model::order::{NewOrder, Order, OrderDetail, OrderItem, OrderItemLine};
use crate::model::tenancy::ApplicationTenancy;
use crate::repo::order_item_repo::OrderItemRepository;
use crate::repo::order_repo::{OrderListQuery, OrderRepository};
use crate::repo::tenancy_repo::TenancyRepository;
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use log::{info, warn};

/// Order service facade over order, item and tenancy repositories.
pub struct OrderService<O, I, T>
where
    O: OrderRepository,
    I: OrderItemRepository,
    T: TenancyRepository,
{
    orders: O,
    items: I,
    tenancies: T,
}

impl<O, I, T> OrderService<O, I, T>
where
    O: OrderRepository,
    I: OrderItemRepository,
    T: TenancyRepository,
{
    pub fn new(orders: O, items: I, tenancies: T) -> Self {
        Self {
            orders,
            items,
            tenancies,
        }
    }

    pub fn find_or_create_order(&self, draft: &NewOrder) -> RepoResult<Order> {
        self.orders.find_or_create(draft)
    }

    pub fn find_order(&self, order_number: &str) -> RepoResult<Option<Order>> {
        self.orders.find_by_order_number(order_number)
    }

    pub fn list_orders(&self, query: &OrderListQuery) -> RepoResult<Vec<Order>> {
        self.orders.list_orders(query)
    }

    /// Appends an item line to `order`; identical lines return the existing item.
    pub fn add_item(&self, order: &Order, line: &OrderItemLine) -> RepoResult<OrderItem> {
        order.add_item(&self.items, line)
    }

    /// Loads an order and the items it has right now.
    pub fn order_detail(&self, order_number: &str) -> RepoResult<Option<OrderDetail>> {
        let Some(order) = self.orders.find_by_order_number(order_number)? else {
            return Ok(None);
        };
        let items = self.items.list_for_order(order.id)?;
        Ok(Some(OrderDetail { order, items }))
    }

    /// Records an approval on `order`.
    ///
    /// On failure (including `OptimisticLock`) `order` is left as it was.
    pub fn approve(
        &self,
        order: &mut Order,
        approved_by: &str,
        approved_on: NaiveDate,
    ) -> RepoResult<()> {
        let previous = (order.approved_by.take(), order.approved_on.take());
        order.approved_by = Some(approved_by.trim().to_string());
        order.approved_on = Some(approved_on);

        match self.orders.update_order(order) {
            Ok(()) => {
                info!(
                    "event=order_approve module=service status=ok order_number={} approved_by={}",
                    order.order_number, approved_by
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=order_approve module=service status=error order_number={} error={}",
                    order.order_number, err
                );
                (order.approved_by, order.approved_on) = previous;
                Err(err)
            }
        }
    }

    /// Resolves the tenancy the order is tagged with.
    pub fn application_tenancy(&self, order: &Order) -> RepoResult<ApplicationTenancy> {
        self.tenancies
            .find_by_path(&order.at_path)?
            .ok_or_else(|| RepoError::not_found("tenancy", &order.at_path))
    }
}
