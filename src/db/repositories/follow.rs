use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Select, Set,
    sea_query::{OnConflict, SelectStatement},
};

use crate::entities::{followers, project, user};
use crate::models::User;

/// Repository for the follow graph (edge table `followers`).
pub struct FollowRepository {
    conn: DatabaseConnection,
}

impl FollowRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Adds the edge `follower -> followed`. Returns false when it already existed.
    pub async fn follow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        let edge = followers::ActiveModel {
            follower_id: Set(follower_id.to_string()),
            followed_id: Set(followed_id.to_string()),
        };

        let inserted = followers::Entity::insert(edge)
            .on_conflict(
                OnConflict::columns([
                    followers::Column::FollowerId,
                    followers::Column::FollowedId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert follow edge")?;

        Ok(inserted > 0)
    }

    /// Removes the edge. Returns false when there was nothing to remove.
    pub async fn unfollow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        let result = followers::Entity::delete_many()
            .filter(followers::Column::FollowerId.eq(follower_id))
            .filter(followers::Column::FollowedId.eq(followed_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete follow edge")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        let count = followers::Entity::find()
            .filter(followers::Column::FollowerId.eq(follower_id))
            .filter(followers::Column::FollowedId.eq(followed_id))
            .count(&self.conn)
            .await
            .context("Failed to query follow edge")?;

        Ok(count > 0)
    }

    /// Number of accounts following `userid`
    pub async fn followers_count(&self, userid: &str) -> Result<u64> {
        followers::Entity::find()
            .filter(followers::Column::FollowedId.eq(userid))
            .count(&self.conn)
            .await
            .context("Failed to count followers")
    }

    /// Number of accounts `userid` follows
    pub async fn followed_count(&self, userid: &str) -> Result<u64> {
        followers::Entity::find()
            .filter(followers::Column::FollowerId.eq(userid))
            .count(&self.conn)
            .await
            .context("Failed to count followed accounts")
    }

    pub async fn followers(&self, userid: &str) -> Result<Vec<User>> {
        let rows = user::Entity::find()
            .filter(user::Column::Userid.in_subquery(Self::follower_ids(userid)))
            .order_by_asc(user::Column::Username)
            .all(&self.conn)
            .await
            .context("Failed to list followers")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn followed(&self, userid: &str) -> Result<Vec<User>> {
        let rows = user::Entity::find()
            .filter(user::Column::Userid.in_subquery(Self::followed_ids(userid)))
            .order_by_asc(user::Column::Username)
            .all(&self.conn)
            .await
            .context("Failed to list followed accounts")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Projects by accounts `userid` follows plus its own, newest first.
    ///
    /// The disjunction makes the union duplicate-free without a `UNION`.
    #[must_use]
    pub fn followed_projects_query(userid: &str) -> Select<project::Entity> {
        project::Entity::find()
            .filter(
                sea_orm::Condition::any()
                    .add(project::Column::Userid.in_subquery(Self::followed_ids(userid)))
                    .add(project::Column::Userid.eq(userid)),
            )
            .order_by_desc(project::Column::Timestamp)
            .order_by_asc(project::Column::Projectid)
    }

    fn follower_ids(userid: &str) -> SelectStatement {
        followers::Entity::find()
            .select_only()
            .column(followers::Column::FollowerId)
            .filter(followers::Column::FollowedId.eq(userid))
            .into_query()
    }

    fn followed_ids(userid: &str) -> SelectStatement {
        followers::Entity::find()
            .select_only()
            .column(followers::Column::FollowedId)
            .filter(followers::Column::FollowerId.eq(userid))
            .into_query()
    }
}
