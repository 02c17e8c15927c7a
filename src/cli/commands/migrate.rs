//! Migrate command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_migrate(config: &Config) -> anyhow::Result<()> {
    // Connecting applies pending migrations.
    let store = Store::new(&config.general.database_path).await?;
    store.ping().await?;

    println!(
        "Database at {} is up to date ({} users).",
        config.general.database_path,
        store.user_count().await?
    );
    Ok(())
}
