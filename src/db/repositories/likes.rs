use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};

use crate::db::unique_violation;
use crate::entities::likes;

pub struct LikesRepository {
    conn: DatabaseConnection,
}

impl LikesRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Flips an existing like of `userid` on `projectid`. Returns the new
    /// state, or `None` when the user never liked the project.
    pub async fn flip(&self, userid: &str, projectid: &str) -> Result<Option<bool>> {
        let txn = self.conn.begin().await.context("Failed to start transaction")?;

        let Some(row) = likes::Entity::find()
            .filter(likes::Column::Userid.eq(userid))
            .filter(likes::Column::Projectid.eq(projectid))
            .one(&txn)
            .await
            .context("Failed to query like")?
        else {
            return Ok(None);
        };

        let liked = !row.is_liked;
        let mut active = row.into_active_model();
        active.is_liked = Set(liked);
        active.timestamp = Set(Utc::now());
        active.update(&txn).await.context("Failed to update like")?;

        txn.commit().await.context("Failed to commit like")?;
        Ok(Some(liked))
    }

    /// Inserts the first like of `userid` on `projectid`. Returns false when
    /// a row for the pair already exists.
    pub async fn insert(&self, likeid: &str, userid: &str, projectid: &str) -> Result<bool> {
        let active = likes::ActiveModel {
            likeid: Set(likeid.to_string()),
            userid: Set(userid.to_string()),
            is_liked: Set(true),
            projectid: Set(projectid.to_string()),
            timestamp: Set(Utc::now()),
        };

        match likes::Entity::insert(active).exec(&self.conn).await {
            Ok(_) => Ok(true),
            Err(e) if unique_violation(&e).is_some() => Ok(false),
            Err(e) => Err(e).context("Failed to insert like"),
        }
    }

    pub async fn count_for_project(&self, projectid: &str) -> Result<u64> {
        likes::Entity::find()
            .filter(likes::Column::Projectid.eq(projectid))
            .filter(likes::Column::IsLiked.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count likes")
    }
}
