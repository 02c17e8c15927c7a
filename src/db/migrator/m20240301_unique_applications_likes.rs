use crate::entities::{applied, likes};
use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const APPLIED_INDEX: &str = "idx_applied_userid_projectid";
const LIKES_INDEX: &str = "idx_likes_userid_projectid";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One application and one like per (user, project).
        manager
            .create_index(
                Index::create()
                    .name(APPLIED_INDEX)
                    .table(Applied)
                    .col(applied::Column::Userid)
                    .col(applied::Column::Projectid)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(LIKES_INDEX)
                    .table(Likes)
                    .col(likes::Column::Userid)
                    .col(likes::Column::Projectid)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(LIKES_INDEX).table(Likes).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name(APPLIED_INDEX).table(Applied).to_owned())
            .await
    }
}
