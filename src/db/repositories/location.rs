use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::location;
use crate::models::LocationChange;

pub struct LocationRepository {
    conn: DatabaseConnection,
}

impl LocationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, locationid: &str) -> Result<Option<location::Model>> {
        location::Entity::find_by_id(locationid.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query location")
    }
}

/// Applies `change` for `userid` on `conn`, usually the transaction that
/// writes the user row. An update of a missing row inserts it.
pub async fn write_change<C>(conn: &C, userid: &str, change: LocationChange) -> Result<()>
where
    C: ConnectionTrait,
{
    let (locationid, lat_long) = match change {
        LocationChange::Update {
            locationid,
            lat_long,
        } => {
            let result = location::Entity::update_many()
                .col_expr(
                    location::Column::LatLong,
                    sea_orm::sea_query::Expr::value(lat_long.clone()),
                )
                .col_expr(
                    location::Column::Timestamp,
                    sea_orm::sea_query::Expr::value(Utc::now()),
                )
                .filter(location::Column::Locationid.eq(locationid.as_str()))
                .exec(conn)
                .await
                .context("Failed to update location")?;

            if result.rows_affected > 0 {
                return Ok(());
            }
            (locationid, Some(lat_long))
        }
        LocationChange::Create {
            locationid,
            lat_long,
        } => (locationid, lat_long),
    };

    let active = location::ActiveModel {
        locationid: Set(locationid),
        lat_long: Set(lat_long),
        userid: Set(userid.to_string()),
        timestamp: Set(Utc::now()),
    };

    location::Entity::insert(active)
        .exec(conn)
        .await
        .context("Failed to insert location")?;

    Ok(())
}
