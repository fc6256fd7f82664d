//! Capex order repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Find-or-create orders by order number.
//! - Versioned updates and tenancy-scoped listing.
//!
//! # Invariants
//! - `order_number` is unique and never rewritten by `update_order`.
//! - Supplier, buyer and tenancy must exist before an order is written.
//! - Deleting an order deletes its items (owned collection).

use crate::model::order::{NewOrder, Order, OrderId};
use crate::model::party::PartyId;
use crate::repo::{
    ensure_connection_ready, insert_or_recover, require_row, require_tenancy,
    stale_update_error, RepoError, RepoResult,
};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const ORDER_SELECT_SQL: &str = "SELECT
    id,
    order_number,
    supplier_reference,
    entry_date,
    order_date,
    supplier_id,
    buyer_id,
    at_path,
    approved_by,
    approved_on,
    version
FROM orders";

/// Query options for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderListQuery {
    /// Only orders visible from this tenancy path.
    pub visible_from: Option<String>,
    pub supplier_id: Option<PartyId>,
    pub buyer_id: Option<PartyId>,
    pub limit: Option<u32>,
    pub offset: u32,
}

pub trait OrderRepository {
    /// Named lookup by natural key (exact, case-sensitive, single row).
    fn find_by_order_number(&self, order_number: &str) -> RepoResult<Option<Order>>;
    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>>;
    /// Returns the order with `draft.order_number`, creating it when absent.
    fn find_or_create(&self, draft: &NewOrder) -> RepoResult<Order>;
    /// Inserts first and falls back to a lookup on a natural-key conflict.
    fn create_or_find(&self, draft: &NewOrder) -> RepoResult<Order>;
    /// Writes mutable attributes back and bumps `order.version`.
    fn update_order(&self, order: &mut Order) -> RepoResult<()>;
    fn list_orders(&self, query: &OrderListQuery) -> RepoResult<Vec<Order>>;
    /// Hard-deletes an order together with its items.
    fn delete_order(&self, id: OrderId) -> RepoResult<()>;
}

pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["orders", "order_items"])?;
        Ok(Self { conn })
    }

    fn check_references(&self, draft: &NewOrder) -> RepoResult<()> {
        require_tenancy(self.conn, &draft.at_path)?;
        require_row(self.conn, "parties", "party", draft.supplier_id)?;
        require_row(self.conn, "parties", "party", draft.buyer_id)
    }

    fn check_draft(&self, draft: &NewOrder) -> RepoResult<()> {
        draft.validate()?;
        self.check_references(draft)
    }

    fn insert(&self, draft: &NewOrder) -> RepoResult<Order> {
        insert_or_recover(
            "order",
            &draft.order_number,
            || {
                self.conn.execute(
                    "INSERT INTO orders (
                        order_number,
                        supplier_reference,
                        entry_date,
                        order_date,
                        supplier_id,
                        buyer_id,
                        at_path,
                        approved_by,
                        approved_on
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                    params![
                        draft.order_number.as_str(),
                        draft.supplier_reference.as_deref(),
                        draft.entry_date,
                        draft.order_date,
                        draft.supplier_id,
                        draft.buyer_id,
                        draft.at_path.as_str(),
                        draft.approved_by.as_deref(),
                        draft.approved_on,
                    ],
                )
            },
            || {
                let id = self.conn.last_insert_rowid();
                self.get_order(id)?
                    .ok_or_else(|| RepoError::not_found("order", id))
            },
            || self.find_by_order_number(&draft.order_number),
        )
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn find_by_order_number(&self, order_number: &str) -> RepoResult<Option<Order>> {
        let order = self
            .conn
            .query_row(
                &format!("{ORDER_SELECT_SQL} WHERE order_number = ?1;"),
                [order_number],
                parse_order_row,
            )
            .optional()?;
        Ok(order)
    }

    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let order = self
            .conn
            .query_row(
                &format!("{ORDER_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_order_row,
            )
            .optional()?;
        Ok(order)
    }

    fn find_or_create(&self, draft: &NewOrder) -> RepoResult<Order> {
        self.check_draft(draft)?;
        if let Some(existing) = self.find_by_order_number(&draft.order_number)? {
            debug!(
                "event=find_or_create module=repo status=existing entity=order key={}",
                draft.order_number
            );
            return Ok(existing);
        }
        self.insert(draft)
    }

    fn create_or_find(&self, draft: &NewOrder) -> RepoResult<Order> {
        self.check_draft(draft)?;
        self.insert(draft)
    }

    fn update_order(&self, order: &mut Order) -> RepoResult<()> {
        let draft = NewOrder {
            order_number: order.order_number.clone(),
            supplier_reference: order.supplier_reference.clone(),
            entry_date: order.entry_date,
            order_date: order.order_date,
            supplier_id: order.supplier_id,
            buyer_id: order.buyer_id,
            at_path: order.at_path.clone(),
            approved_by: order.approved_by.clone(),
            approved_on: order.approved_on,
        };
        self.check_draft(&draft)?;

        let changed = self.conn.execute(
            "UPDATE orders
             SET
                supplier_reference = ?1,
                entry_date = ?2,
                order_date = ?3,
                supplier_id = ?4,
                buyer_id = ?5,
                at_path = ?6,
                approved_by = ?7,
                approved_on = ?8,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?9
               AND version = ?10;",
            params![
                order.supplier_reference.as_deref(),
                order.entry_date,
                order.order_date,
                order.supplier_id,
                order.buyer_id,
                order.at_path.as_str(),
                order.approved_by.as_deref(),
                order.approved_on,
                order.id,
                order.version,
            ],
        )?;

        if changed == 0 {
            return Err(stale_update_error(
                self.conn,
                "orders",
                "order",
                order.id,
                order.version,
            ));
        }

        order.version += 1;
        info!(
            "event=order_update module=repo status=ok order_number={} version={}",
            order.order_number, order.version
        );
        Ok(())
    }

    fn list_orders(&self, query: &OrderListQuery) -> RepoResult<Vec<Order>> {
        let mut sql = format!("{ORDER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(viewer_path) = query.visible_from.as_deref() {
            sql.push_str(
                " AND (? = '/' OR at_path = ? OR substr(at_path, 1, length(?) + 1) = ? || '/')",
            );
            for _ in 0..4 {
                bind_values.push(Value::Text(viewer_path.to_string()));
            }
        }

        if let Some(supplier_id) = query.supplier_id {
            sql.push_str(" AND supplier_id = ?");
            bind_values.push(Value::Integer(supplier_id));
        }

        if let Some(buyer_id) = query.buyer_id {
            sql.push_str(" AND buyer_id = ?");
            bind_values.push(Value::Integer(buyer_id));
        }

        sql.push_str(" ORDER BY order_number ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), parse_order_row)?;
        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?);
        }
        Ok(orders)
    }

    fn delete_order(&self, id: OrderId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM orders WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("order", id));
        }
        info!("event=order_delete module=repo status=ok id={id}");
        Ok(())
    }
}

fn parse_order_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get("id")?,
        order_number: row.get("order_number")?,
        supplier_reference: row.get("supplier_reference")?,
        entry_date: row.get("entry_date")?,
        order_date: row.get("order_date")?,
        supplier_id: row.get("supplier_id")?,
        buyer_id: row.get("buyer_id")?,
        at_path: row.get("at_path")?,
        approved_by: row.get("approved_by")?,
        approved_on: row.get("approved_on")?,
        version: row.get("version")?,
    })
}
