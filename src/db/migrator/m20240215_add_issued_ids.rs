use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IssuedIds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssuedIds::Suffix)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IssuedIds::Prefix).string().not_null())
                    .col(
                        ColumnDef::new(IssuedIds::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IssuedIds::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IssuedIds {
    Table,
    Suffix,
    Prefix,
    IssuedAt,
}
