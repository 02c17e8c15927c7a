use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};

use crate::db::{PageOf, clamp_page};
use crate::entities::{message, user};
use crate::models::ChannelMessage;

pub struct MessageRepository {
    conn: DatabaseConnection,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn post(
        &self,
        messageid: &str,
        userid: &str,
        channel: &str,
        content: &str,
    ) -> Result<()> {
        let active = message::ActiveModel {
            messageid: Set(messageid.to_string()),
            userid: Set(userid.to_string()),
            channel: Set(channel.to_string()),
            content: Set(content.to_string()),
            timestamp: Set(Utc::now()),
        };

        message::Entity::insert(active)
            .exec(&self.conn)
            .await
            .context("Failed to insert message")?;

        Ok(())
    }

    /// Messages of `channel` in posting order.
    pub async fn channel_page(
        &self,
        channel: &str,
        page: u64,
        per_page: u64,
    ) -> Result<PageOf<ChannelMessage>> {
        let paginator = message::Entity::find()
            .select_only()
            .columns([
                message::Column::Messageid,
                message::Column::Userid,
                message::Column::Channel,
                message::Column::Content,
                message::Column::Timestamp,
            ])
            .column(user::Column::Username)
            .join(JoinType::InnerJoin, message::Relation::Author.def())
            .filter(message::Column::Channel.eq(channel))
            .order_by_asc(message::Column::Timestamp)
            .order_by_asc(message::Column::Messageid)
            .into_model::<ChannelMessage>()
            .paginate(&self.conn, per_page);

        let totals = paginator
            .num_items_and_pages()
            .await
            .context("Failed to count messages")?;
        let page = clamp_page(page, totals.number_of_pages);
        let items = paginator
            .fetch_page(page - 1)
            .await
            .context("Failed to fetch messages")?;

        Ok(PageOf::new(
            items,
            page,
            per_page,
            totals.number_of_items,
            totals.number_of_pages,
        ))
    }
}
