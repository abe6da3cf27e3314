//! Extra utilities for use elsewhere in the crate.

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::config::settings;
use crate::db::PgStore;

pub fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub async fn connect_to_db() -> Result<PgStore> {
    let db_url = settings()
        .database_url
        .as_deref()
        .context("`DATABASE_URL` not set")?;

    PgStore::connect(db_url)
        .await
        .context("Failed to connect to database")
}
