use sea_orm::entity::prelude::*;

/// Registry of every identifier suffix handed out so far.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "issued_ids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub suffix: String,

    pub prefix: String,

    pub issued_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
