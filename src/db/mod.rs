use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{applied, location};
use crate::models::{
    Application, ChannelMessage, MisconductReport, NewProject, NewUser, Project, ProjectPatch,
    User, UserPatch,
};

pub mod migrator;
pub mod repositories;

pub use repositories::application::AcceptOutcome;
pub use repositories::project::ProjectWriteError;
pub use repositories::user::{HashParams, UserWriteError, check_password, hash_password};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    hash_params: HashParams,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1, HashParams::default()).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
        hash_params: HashParams,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn, hash_params })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone(), self.hash_params)
    }

    fn follow_repo(&self) -> repositories::follow::FollowRepository {
        repositories::follow::FollowRepository::new(self.conn.clone())
    }

    fn project_repo(&self) -> repositories::project::ProjectRepository {
        repositories::project::ProjectRepository::new(self.conn.clone())
    }

    fn application_repo(&self) -> repositories::application::ApplicationRepository {
        repositories::application::ApplicationRepository::new(self.conn.clone())
    }

    fn message_repo(&self) -> repositories::message::MessageRepository {
        repositories::message::MessageRepository::new(self.conn.clone())
    }

    fn misconduct_repo(&self) -> repositories::misconduct::MisconductRepository {
        repositories::misconduct::MisconductRepository::new(self.conn.clone())
    }

    fn likes_repo(&self) -> repositories::likes::LikesRepository {
        repositories::likes::LikesRepository::new(self.conn.clone())
    }

    fn location_repo(&self) -> repositories::location::LocationRepository {
        repositories::location::LocationRepository::new(self.conn.clone())
    }

    fn id_repo(&self) -> repositories::ids::IdRepository {
        repositories::ids::IdRepository::new(self.conn.clone())
    }

    // Users

    pub async fn create_user(
        &self,
        new_user: NewUser,
        details: UserPatch,
    ) -> Result<User, UserWriteError> {
        self.user_repo().create(new_user, details).await
    }

    pub async fn get_user(&self, userid: &str) -> Result<Option<User>> {
        self.user_repo().get_by_id(userid).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn username_taken(&self, username: &str, except: Option<&str>) -> Result<bool> {
        self.user_repo().username_taken(username, except).await
    }

    pub async fn email_taken(&self, email: &str, except: Option<&str>) -> Result<bool> {
        self.user_repo().email_taken(email, except).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user(&self, userid: &str, patch: UserPatch) -> Result<User, UserWriteError> {
        self.user_repo().update(userid, patch).await
    }

    pub async fn touch_last_seen(&self, userid: &str) -> Result<()> {
        self.user_repo().touch_last_seen(userid).await
    }

    pub async fn user_count(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    // Follow graph

    pub async fn follow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.follow_repo().follow(follower_id, followed_id).await
    }

    pub async fn unfollow(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.follow_repo().unfollow(follower_id, followed_id).await
    }

    pub async fn is_following(&self, follower_id: &str, followed_id: &str) -> Result<bool> {
        self.follow_repo().is_following(follower_id, followed_id).await
    }

    pub async fn followers_count(&self, userid: &str) -> Result<u64> {
        self.follow_repo().followers_count(userid).await
    }

    pub async fn followed_count(&self, userid: &str) -> Result<u64> {
        self.follow_repo().followed_count(userid).await
    }

    pub async fn followers(&self, userid: &str) -> Result<Vec<User>> {
        self.follow_repo().followers(userid).await
    }

    pub async fn followed(&self, userid: &str) -> Result<Vec<User>> {
        self.follow_repo().followed(userid).await
    }

    // Projects

    pub async fn create_project(&self, new_project: NewProject) -> Result<Project, ProjectWriteError> {
        self.project_repo().create(new_project).await
    }

    pub async fn get_project(&self, projectid: &str) -> Result<Option<Project>> {
        self.project_repo().get(projectid).await
    }

    pub async fn get_project_by_channel(&self, channel: &str) -> Result<Option<Project>> {
        self.project_repo().get_by_channel(channel).await
    }

    pub async fn channel_taken(&self, channel: &str) -> Result<bool> {
        self.project_repo().channel_taken(channel).await
    }

    pub async fn projects_for_user(&self, userid: &str) -> Result<Vec<Project>> {
        self.project_repo().list_for_user(userid).await
    }

    pub async fn update_project(
        &self,
        projectid: &str,
        patch: ProjectPatch,
    ) -> Result<Project, ProjectWriteError> {
        self.project_repo().update(projectid, patch).await
    }

    pub async fn followed_projects(&self, userid: &str) -> Result<Vec<Project>> {
        self.project_repo().followed_projects(userid).await
    }

    pub async fn followed_projects_page(
        &self,
        userid: &str,
        page: u64,
        per_page: u64,
    ) -> Result<PageOf<Project>> {
        self.project_repo()
            .followed_projects_page(userid, page, per_page)
            .await
    }

    pub async fn explore_page(&self, page: u64, per_page: u64) -> Result<PageOf<Project>> {
        self.project_repo().explore_page(page, per_page).await
    }

    // Applications

    pub async fn apply_to_project(
        &self,
        appliedid: &str,
        userid: &str,
        projectid: &str,
        body: Option<&str>,
    ) -> Result<bool> {
        self.application_repo()
            .apply(appliedid, userid, projectid, body)
            .await
    }

    pub async fn has_applied(&self, userid: &str, projectid: &str) -> Result<bool> {
        self.application_repo().has_applied(userid, projectid).await
    }

    pub async fn is_member(&self, userid: &str, projectid: &str) -> Result<bool> {
        self.application_repo().is_member(userid, projectid).await
    }

    pub async fn get_application(&self, appliedid: &str) -> Result<Option<applied::Model>> {
        self.application_repo().get(appliedid).await
    }

    pub async fn applications_for_project(&self, projectid: &str) -> Result<Vec<Application>> {
        self.application_repo().list_for_project(projectid).await
    }

    pub async fn accept_application(&self, appliedid: &str) -> Result<AcceptOutcome> {
        self.application_repo().accept(appliedid).await
    }

    // Messages

    pub async fn post_message(
        &self,
        messageid: &str,
        userid: &str,
        channel: &str,
        content: &str,
    ) -> Result<()> {
        self.message_repo()
            .post(messageid, userid, channel, content)
            .await
    }

    pub async fn channel_messages(
        &self,
        channel: &str,
        page: u64,
        per_page: u64,
    ) -> Result<PageOf<ChannelMessage>> {
        self.message_repo().channel_page(channel, page, per_page).await
    }

    // Misconduct

    pub async fn report_misconduct(
        &self,
        causeid: &str,
        reporter_id: &str,
        reported_id: &str,
        cause: &str,
        description: Option<&str>,
    ) -> Result<MisconductReport> {
        self.misconduct_repo()
            .report(causeid, reporter_id, reported_id, cause, description)
            .await
    }

    pub async fn reports_by(&self, userid: &str) -> Result<Vec<MisconductReport>> {
        self.misconduct_repo().list_by_reporter(userid).await
    }

    pub async fn reports_against_count(&self, userid: &str) -> Result<u64> {
        self.misconduct_repo().count_against(userid).await
    }

    // Likes

    pub async fn flip_like(&self, userid: &str, projectid: &str) -> Result<Option<bool>> {
        self.likes_repo().flip(userid, projectid).await
    }

    pub async fn insert_like(&self, likeid: &str, userid: &str, projectid: &str) -> Result<bool> {
        self.likes_repo().insert(likeid, userid, projectid).await
    }

    pub async fn like_count(&self, projectid: &str) -> Result<u64> {
        self.likes_repo().count_for_project(projectid).await
    }

    // Locations

    pub async fn get_location(&self, locationid: &str) -> Result<Option<location::Model>> {
        self.location_repo().get(locationid).await
    }

    // Issued identifiers

    pub async fn record_issued_id(&self, prefix: &str, suffix: &str) -> Result<bool> {
        self.id_repo().record(prefix, suffix).await
    }

    pub async fn is_id_issued(&self, suffix: &str) -> Result<bool> {
        self.id_repo().is_issued(suffix).await
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Keeps a requested 1-based page within `1..=total_pages`, so the row
/// offset handed to the paginator cannot overflow.
#[must_use]
pub const fn clamp_page(page: u64, total_pages: u64) -> u64 {
    let last = if total_pages == 0 { 1 } else { total_pages };
    if page == 0 {
        1
    } else if page > last {
        last
    } else {
        page
    }
}

impl<T> PageOf<T> {
    #[must_use]
    pub const fn new(
        items: Vec<T>,
        page: u64,
        per_page: u64,
        total_items: u64,
        total_pages: u64,
    ) -> Self {
        Self {
            items,
            page,
            per_page,
            total_items,
            total_pages,
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Column named by a unique-constraint failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UniqueField {
    Column(String),
    Unknown,
}

/// Detects a unique or primary-key violation and extracts the offending column.
///
/// SQLite reports primary-key collisions with a different extended code than
/// other unique indexes, so the message text is checked as well.
pub(crate) fn unique_violation(err: &DbErr) -> Option<UniqueField> {
    let message = match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => message,
        _ => {
            let text = err.to_string();
            if !text.contains("UNIQUE constraint failed") {
                return None;
            }
            text
        }
    };

    Some(parse_unique_message(&message))
}

fn parse_unique_message(message: &str) -> UniqueField {
    let Some((_, rest)) = message.split_once("UNIQUE constraint failed:") else {
        return UniqueField::Unknown;
    };

    rest.split(',')
        .next()
        .and_then(|qualified| qualified.trim().split_once('.'))
        .map(|(_, column)| column.trim().trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_'))
        .filter(|column| !column.is_empty())
        .map_or(UniqueField::Unknown, |column| UniqueField::Column(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unique_message() {
        assert_eq!(
            parse_unique_message("UNIQUE constraint failed: user.username"),
            UniqueField::Column("username".to_string())
        );
        assert_eq!(
            parse_unique_message(
                "error returned from database: (code: 1555) UNIQUE constraint failed: issued_ids.suffix"
            ),
            UniqueField::Column("suffix".to_string())
        );
        assert_eq!(
            parse_unique_message("UNIQUE constraint failed: followers.follower_id, followers.followed_id"),
            UniqueField::Column("follower_id".to_string())
        );
        assert_eq!(parse_unique_message("something else"), UniqueField::Unknown);
    }

    #[test]
    fn test_page_navigation() {
        let page = PageOf::new(vec![1, 2], 2, 2, 5, 3);
        assert!(page.has_next());
        assert!(page.has_prev());

        let last = PageOf::new(vec![5], 3, 2, 5, 3);
        assert!(!last.has_next());

        let empty: PageOf<i32> = PageOf::new(Vec::new(), 1, 10, 0, 0);
        assert!(!empty.has_next());
        assert!(!empty.has_prev());
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 3), 1);
        assert_eq!(clamp_page(2, 3), 2);
        assert_eq!(clamp_page(u64::MAX, 3), 3);
        assert_eq!(clamp_page(u64::MAX, 0), 1);
    }
}
