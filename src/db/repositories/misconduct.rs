use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::misconduct;
use crate::models::MisconductReport;

pub struct MisconductRepository {
    conn: DatabaseConnection,
}

impl MisconductRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn report(
        &self,
        causeid: &str,
        reporter_id: &str,
        reported_id: &str,
        cause: &str,
        description: Option<&str>,
    ) -> Result<MisconductReport> {
        let active = misconduct::ActiveModel {
            causeid: Set(causeid.to_string()),
            userid: Set(reporter_id.to_string()),
            misconduct_userid: Set(reported_id.to_string()),
            cause: Set(cause.to_string()),
            block: Set(false),
            description: Set(description.map(ToString::to_string)),
            timestamp: Set(Utc::now()),
        };

        let model = misconduct::Entity::insert(active)
            .exec_with_returning(&self.conn)
            .await
            .context("Failed to insert misconduct report")?;

        Ok(MisconductReport::from(model))
    }

    /// Reports filed by `userid`, newest first
    pub async fn list_by_reporter(&self, userid: &str) -> Result<Vec<MisconductReport>> {
        let rows = misconduct::Entity::find()
            .filter(misconduct::Column::Userid.eq(userid))
            .order_by_desc(misconduct::Column::Timestamp)
            .all(&self.conn)
            .await
            .context("Failed to list misconduct reports")?;

        Ok(rows.into_iter().map(MisconductReport::from).collect())
    }

    pub async fn count_against(&self, userid: &str) -> Result<u64> {
        misconduct::Entity::find()
            .filter(misconduct::Column::MisconductUserid.eq(userid))
            .count(&self.conn)
            .await
            .context("Failed to count misconduct reports")
    }
}
