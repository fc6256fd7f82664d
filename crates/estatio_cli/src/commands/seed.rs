use anyhow::{anyhow, Context};
use estatio_core::db::Connection;
use estatio_core::fixture::{builtin_fixtures, find_fixture, run_fixture};
use log::warn;

const IN_MEMORY_NOTICE: &str =
    "seeding an in-memory store; nothing is kept after exit (pass --db or set ESTATIO_DB_PATH)";

/// Runs the named fixture. `persistent` is false for in-memory stores.
pub fn seed(conn: &mut Connection, name: &str, persistent: bool) -> anyhow::Result<()> {
    let fixture = find_fixture(name)
        .ok_or_else(|| anyhow!("unknown fixture `{name}`; run `estatio fixtures` to list them"))?;
    if let Some(notice) = store_notice(persistent) {
        warn!("event=cli_seed module=cli status=ephemeral fixture={name}");
        eprintln!("warning: {notice}");
    }
    let report =
        run_fixture(conn, fixture).with_context(|| format!("fixture `{name}` failed"))?;

    println!("run {} executed {} fixture(s)", report.run_id, report.executed.len());
    for result in &report.results {
        println!("{:>3}  {:<28} {}", result.sequence, result.fixture, result.key);
    }
    Ok(())
}

fn store_notice(persistent: bool) -> Option<&'static str> {
    (!persistent).then_some(IN_MEMORY_NOTICE)
}

pub fn list_fixtures() {
    for fixture in builtin_fixtures() {
        println!("{}", fixture.name());
    }
}
