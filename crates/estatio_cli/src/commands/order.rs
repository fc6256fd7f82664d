use anyhow::anyhow;
use estatio_core::db::Connection;
use estatio_core::repo::order_item_repo::SqliteOrderItemRepository;
use estatio_core::repo::order_repo::SqliteOrderRepository;
use estatio_core::repo::tenancy_repo::SqliteTenancyRepository;
use estatio_core::OrderService;

pub fn show_order(conn: &Connection, order_number: &str) -> anyhow::Result<()> {
    let service = OrderService::new(
        SqliteOrderRepository::try_new(conn)?,
        SqliteOrderItemRepository::try_new(conn)?,
        SqliteTenancyRepository::try_new(conn)?,
    );
    let detail = service
        .order_detail(order_number)?
        .ok_or_else(|| anyhow!("order `{order_number}` not found"))?;
    let tenancy = service.application_tenancy(&detail.order)?;

    let order = &detail.order;
    println!("order       {}", order.order_number);
    println!("tenancy     {} ({})", tenancy.path, tenancy.name);
    println!("entry date  {}", order.entry_date);
    if let Some(order_date) = order.order_date {
        println!("order date  {order_date}");
    }
    if let Some(supplier_reference) = order.supplier_reference.as_deref() {
        println!("supplier #  {supplier_reference}");
    }
    match (order.approved_by.as_deref(), order.approved_on) {
        (Some(by), Some(on)) => println!("approved    {by} on {on}"),
        (Some(by), None) => println!("approved    {by}"),
        _ => println!("approved    no"),
    }
    println!("version     {}", order.version);

    for (position, item) in detail.items.iter().enumerate() {
        let gross = item
            .line
            .gross_amount
            .map(|amount| amount.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>2}. {:<32} {:>12}", position + 1, item.line.description, gross);
    }
    Ok(())
}
