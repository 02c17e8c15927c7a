use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::db::unique_violation;
use crate::entities::issued_ids;

/// Persistent registry of issued identifier suffixes.
pub struct IdRepository {
    conn: DatabaseConnection,
}

impl IdRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Records `suffix` as used. Returns false when it was already issued;
    /// the primary key makes the check and the write a single step.
    pub async fn record(&self, prefix: &str, suffix: &str) -> Result<bool> {
        let active = issued_ids::ActiveModel {
            suffix: Set(suffix.to_string()),
            prefix: Set(prefix.to_string()),
            issued_at: Set(Utc::now()),
        };

        match issued_ids::Entity::insert(active).exec(&self.conn).await {
            Ok(_) => Ok(true),
            Err(e) if unique_violation(&e).is_some() => Ok(false),
            Err(e) => Err(e).context("Failed to record issued id"),
        }
    }

    pub async fn is_issued(&self, suffix: &str) -> Result<bool> {
        let row = issued_ids::Entity::find_by_id(suffix.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query issued id")?;

        Ok(row.is_some())
    }
}
