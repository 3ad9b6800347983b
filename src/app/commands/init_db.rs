use log::*;

use actix_rt::System;

use crate::{
  error::*,
  app::*,
  db::{Backend, DbService},
};

/// Database schema, safe to apply more than once.
pub const SCHEMA: &str = include_str!("../../../sql/schema.sql");

async fn apply_schema(url: String) -> Result<()> {
  let db = DbService::new(&url);
  db.batch_execute(SCHEMA).await
}

pub fn execute(config: AppConfig) -> Result<()> {
  match Backend::from_url(&config.require_str("db.url")?) {
    Backend::Postgres(url) => {
      info!("init-db: applying schema.");
      let sys = System::new();
      sys.block_on(apply_schema(url))?;
      info!("init-db: done.");
    },
    Backend::Memory(_) => {
      info!("init-db: memory store needs no schema.");
    },
  }
  Ok(())
}
