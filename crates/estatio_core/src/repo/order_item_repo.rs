//! Order item repository.
//!
//! Items are matched on their parent order plus every line field, through
//! the canonical `item_key` column. The parent's item collection is simply
//! `list_for_order`, a query over the back-reference.

use crate::model::order::{Order, OrderId, OrderItem, OrderItemId, OrderItemLine};
use crate::model::reference::ReferenceKind;
use crate::repo::{
    decimal_to_db, ensure_connection_ready, insert_or_recover, parse_decimal, require_row,
    RepoError, RepoResult,
};
use log::debug;
use rusqlite::{params, Connection, Row};

const ORDER_ITEM_SELECT_SQL: &str = "SELECT
    id,
    order_id,
    charge_id,
    description,
    net_amount,
    vat_amount,
    gross_amount,
    tax_id,
    start_date,
    end_date,
    property_id,
    project_id,
    version
FROM order_items";

pub trait OrderItemRepository {
    fn find(&self, order_id: OrderId, line: &OrderItemLine) -> RepoResult<Option<OrderItem>>;
    /// Returns the item of `order` matching every field of `line`, creating it when absent.
    fn find_or_create(&self, order: &Order, line: &OrderItemLine) -> RepoResult<OrderItem>;
    /// Items of one order in insertion order.
    fn list_for_order(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>>;
}

pub struct SqliteOrderItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderItemRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["orders", "order_items"])?;
        Ok(Self { conn })
    }

    fn query_items(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<OrderItem>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_order_item_row(row)?);
        }
        Ok(items)
    }

    fn get_by_id(&self, id: OrderItemId) -> RepoResult<OrderItem> {
        self.query_items(&format!("{ORDER_ITEM_SELECT_SQL} WHERE id = ?1;"), [id])?
            .pop()
            .ok_or_else(|| RepoError::not_found("order_item", id))
    }

    fn check_references(&self, order_id: OrderId, line: &OrderItemLine) -> RepoResult<()> {
        require_row(self.conn, "orders", "order", order_id)?;
        let references = [
            (ReferenceKind::Charge, Some(line.charge_id)),
            (ReferenceKind::Tax, line.tax_id),
            (ReferenceKind::Property, line.property_id),
            (ReferenceKind::Project, line.project_id),
        ];
        for (kind, id) in references {
            if let Some(id) = id {
                require_row(self.conn, kind.table(), kind.entity(), id)?;
            }
        }
        Ok(())
    }
}

impl OrderItemRepository for SqliteOrderItemRepository<'_> {
    fn find(&self, order_id: OrderId, line: &OrderItemLine) -> RepoResult<Option<OrderItem>> {
        let mut items = self.query_items(
            &format!("{ORDER_ITEM_SELECT_SQL} WHERE order_id = ?1 AND item_key = ?2;"),
            params![order_id, line.item_key()],
        )?;
        Ok(items.pop())
    }

    fn find_or_create(&self, order: &Order, line: &OrderItemLine) -> RepoResult<OrderItem> {
        line.validate()?;
        self.check_references(order.id, line)?;

        if let Some(existing) = self.find(order.id, line)? {
            debug!(
                "event=find_or_create module=repo status=existing entity=order_item order_number={} id={}",
                order.order_number, existing.id
            );
            return Ok(existing);
        }

        let item_key = line.item_key();
        insert_or_recover(
            "order_item",
            &format!("{}/{}", order.order_number, line.description),
            || {
                self.conn.execute(
                    "INSERT INTO order_items (
                        order_id,
                        item_key,
                        charge_id,
                        description,
                        net_amount,
                        vat_amount,
                        gross_amount,
                        tax_id,
                        start_date,
                        end_date,
                        property_id,
                        project_id
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
                    params![
                        order.id,
                        item_key.as_str(),
                        line.charge_id,
                        line.description.as_str(),
                        decimal_to_db(line.net_amount),
                        decimal_to_db(line.vat_amount),
                        decimal_to_db(line.gross_amount),
                        line.tax_id,
                        line.start_date,
                        line.end_date,
                        line.property_id,
                        line.project_id,
                    ],
                )
            },
            || self.get_by_id(self.conn.last_insert_rowid()),
            || self.find(order.id, line),
        )
    }

    fn list_for_order(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>> {
        self.query_items(
            &format!("{ORDER_ITEM_SELECT_SQL} WHERE order_id = ?1 ORDER BY id ASC;"),
            [order_id],
        )
    }
}

fn parse_order_item_row(row: &Row<'_>) -> RepoResult<OrderItem> {
    let line = OrderItemLine {
        charge_id: row.get("charge_id")?,
        description: row.get("description")?,
        net_amount: parse_decimal("order_items.net_amount", row.get("net_amount")?)?,
        vat_amount: parse_decimal("order_items.vat_amount", row.get("vat_amount")?)?,
        gross_amount: parse_decimal("order_items.gross_amount", row.get("gross_amount")?)?,
        tax_id: row.get("tax_id")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        property_id: row.get("property_id")?,
        project_id: row.get("project_id")?,
    };
    Ok(OrderItem {
        id: row.get("id")?,
        order_id: row.get("order_id")?,
        line,
        version: row.get("version")?,
    })
}
