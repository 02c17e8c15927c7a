use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create_from_entity<E>(
    manager: &SchemaManager<'_>,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr>
where
    E: EntityTrait + Copy,
{
    manager
        .create_table(
            schema
                .create_table_from_entity(entity)
                .if_not_exists()
                .to_owned(),
        )
        .await?;

    for mut index in schema.create_index_from_entity(entity) {
        manager.create_index(index.if_not_exists().to_owned()).await?;
    }

    Ok(())
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Parents before children so the foreign keys resolve.
        create_from_entity(manager, &schema, User).await?;
        create_from_entity(manager, &schema, Location).await?;
        create_from_entity(manager, &schema, Project).await?;
        create_from_entity(manager, &schema, Followers).await?;
        create_from_entity(manager, &schema, Misconduct).await?;
        create_from_entity(manager, &schema, Message).await?;
        create_from_entity(manager, &schema, Applied).await?;
        create_from_entity(manager, &schema, Likes).await?;

        // Incoming edges ("who follows X") are looked up by followed_id alone.
        manager
            .create_index(
                Index::create()
                    .name("idx_followers_followed_id")
                    .table(Followers)
                    .col(crate::entities::followers::Column::FollowedId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Likes).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Applied).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Message).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Misconduct).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Followers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Project).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Location).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User).to_owned())
            .await?;

        Ok(())
    }
}
