//! Generate identifier command handler

use crate::config::Config;
use crate::db::Store;
use crate::services::{IdKind, IdRegistry};

pub async fn cmd_generate_id(config: &Config, kind: &str, sample: bool) -> anyhow::Result<()> {
    let Some(kind) = IdKind::parse(kind) else {
        anyhow::bail!(
            "Unknown identifier kind: {kind}. Use user, project, channel, misconduct, like, application, location or message"
        );
    };

    let store = Store::new(&config.general.database_path).await?;
    let ids = IdRegistry::new(store);

    let id = if sample {
        ids.sample(kind).await?
    } else {
        ids.issue(kind).await?
    };

    println!("{id}");
    Ok(())
}
