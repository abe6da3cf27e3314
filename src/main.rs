//! Command line tools for the chapter's attendance backend

use std::env::args;
use std::sync::Arc;

use anyhow::{Context, Result};
use axo::config::{self, Settings};
use axo::db::{DbConn, MemoryStore};
use axo::graphql::build_schema;
use axo::models::attendance::report::{ReportOrder, RosterEntry};
use axo::models::term::Term;
use axo::notify::LogNotifier;
use axo::util::{connect_to_db, current_time};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Please use `print-schema`, `migrate`, or `report [term-id] [--by-percentage]`.";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "axo=info".into()))
        .init();
    config::init(Settings::from_env()?);

    let args: Vec<String> = args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("print-schema") => {
            let schema = build_schema(DbConn::new(MemoryStore::new()), Arc::new(LogNotifier));
            println!("{}", schema.sdl());
        }
        Some("migrate") => {
            connect_to_db().await?.migrate().await?;
            tracing::info!("migrations are up to date");
        }
        Some("report") => print_report(&args[1..]).await?,
        Some(other) => {
            eprintln!("Unexpected command `{other}`. {USAGE}");
        }
        None => {
            eprintln!("No command provided. {USAGE}");
        }
    }

    Ok(())
}

async fn print_report(args: &[String]) -> Result<()> {
    let conn = DbConn::new(connect_to_db().await?);
    let order = if args.iter().any(|arg| arg == "--by-percentage") {
        ReportOrder::Percentage
    } else {
        ReportOrder::Name
    };
    let term = match args.iter().find(|arg| !arg.starts_with("--")) {
        Some(id) => Term::with_id(id.parse().context("Term IDs are numbers")?, &conn).await?,
        None => Term::most_recent(&conn)
            .await?
            .context("No terms have been created yet")?,
    };

    println!("{term}");
    for entry in RosterEntry::for_term(term.id, order, &conn, current_time()).await? {
        println!("{:<30} {}", entry.member.name(), entry.percentage());
    }

    Ok(())
}
