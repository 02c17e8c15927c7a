use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user")]
pub struct Model {
    /// `UID_` token, never changes after registration
    #[sea_orm(primary_key, auto_increment = false)]
    pub userid: String,

    #[sea_orm(unique)]
    pub username: String,

    pub name: Option<String>,

    pub dob: Option<Date>,

    pub gender: Option<String>,

    /// Semicolon separated topics
    pub interests: Option<String>,

    pub github_profile: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub about_me: Option<String>,

    pub locationid: Option<String>,

    pub privacy: Option<bool>,

    #[sea_orm(unique, indexed)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: Option<String>,

    #[sea_orm(indexed)]
    pub timestamp: DateTimeUtc,

    pub last_seen: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project::Entity")]
    Projects,

    #[sea_orm(has_many = "super::misconduct::Entity")]
    Reports,

    #[sea_orm(has_many = "super::applied::Entity")]
    ProjectsApplied,

    #[sea_orm(has_many = "super::message::Entity")]
    Messages,

    #[sea_orm(has_many = "super::likes::Entity")]
    Likes,

    #[sea_orm(has_many = "super::location::Entity")]
    Locations,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::misconduct::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl Related<super::applied::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectsApplied.def()
    }
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Related<super::likes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Locations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
