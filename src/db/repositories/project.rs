use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
};

use crate::db::{PageOf, UniqueField, clamp_page, unique_violation};
use crate::entities::project;
use crate::models::{NewProject, Project, ProjectPatch};

use super::follow::FollowRepository;

#[derive(Debug, thiserror::Error)]
pub enum ProjectWriteError {
    #[error("channel already in use")]
    DuplicateChannel,

    #[error("project id already in use")]
    DuplicateId,

    #[error("project not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProjectWriteError {
    fn from_db(err: sea_orm::DbErr, action: &'static str) -> Self {
        match unique_violation(&err) {
            Some(UniqueField::Column(column)) if column == "channel" => Self::DuplicateChannel,
            Some(_) => Self::DuplicateId,
            None => Self::Other(anyhow::Error::new(err).context(action)),
        }
    }
}

pub struct ProjectRepository {
    conn: DatabaseConnection,
}

impl ProjectRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new_project: NewProject) -> Result<Project, ProjectWriteError> {
        let mut active = project::ActiveModel {
            projectid: Set(new_project.projectid),
            userid: Set(new_project.userid),
            name: Set(new_project.name),
            fields: Set(new_project.fields),
            members_required: Set(None),
            members: Set(None),
            member_list: Set(None),
            project_description: Set(None),
            owner: Set(true),
            channel: Set(None),
            timestamp: Set(new_project.timestamp.unwrap_or_else(Utc::now)),
        };
        new_project.details.apply(&mut active);

        let model = active
            .insert(&self.conn)
            .await
            .map_err(|e| ProjectWriteError::from_db(e, "Failed to insert project"))?;

        Ok(Project::from(model))
    }

    pub async fn get(&self, projectid: &str) -> Result<Option<Project>> {
        let row = project::Entity::find_by_id(projectid.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query project")?;

        Ok(row.map(Project::from))
    }

    pub async fn get_by_channel(&self, channel: &str) -> Result<Option<Project>> {
        let row = project::Entity::find()
            .filter(project::Column::Channel.eq(channel))
            .one(&self.conn)
            .await
            .context("Failed to query project by channel")?;

        Ok(row.map(Project::from))
    }

    pub async fn channel_taken(&self, channel: &str) -> Result<bool> {
        let count = project::Entity::find()
            .filter(project::Column::Channel.eq(channel))
            .count(&self.conn)
            .await
            .context("Failed to check channel")?;

        Ok(count > 0)
    }

    /// Projects authored by `userid`, newest first
    pub async fn list_for_user(&self, userid: &str) -> Result<Vec<Project>> {
        let rows = project::Entity::find()
            .filter(project::Column::Userid.eq(userid))
            .order_by_desc(project::Column::Timestamp)
            .all(&self.conn)
            .await
            .context("Failed to list projects for user")?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    pub async fn update(
        &self,
        projectid: &str,
        patch: ProjectPatch,
    ) -> Result<Project, ProjectWriteError> {
        let row = project::Entity::find_by_id(projectid.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query project for update")?
            .ok_or_else(|| ProjectWriteError::NotFound(projectid.to_string()))?;

        let mut active = row.into_active_model();
        patch.apply(&mut active);

        let model = active
            .update(&self.conn)
            .await
            .map_err(|e| ProjectWriteError::from_db(e, "Failed to update project"))?;

        Ok(Project::from(model))
    }

    pub async fn followed_projects(&self, userid: &str) -> Result<Vec<Project>> {
        let rows = FollowRepository::followed_projects_query(userid)
            .all(&self.conn)
            .await
            .context("Failed to query followed projects")?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    pub async fn followed_projects_page(
        &self,
        userid: &str,
        page: u64,
        per_page: u64,
    ) -> Result<PageOf<Project>> {
        self.fetch_page(FollowRepository::followed_projects_query(userid), page, per_page)
            .await
    }

    /// Every project, newest first
    pub async fn explore_page(&self, page: u64, per_page: u64) -> Result<PageOf<Project>> {
        let query = project::Entity::find()
            .order_by_desc(project::Column::Timestamp)
            .order_by_asc(project::Column::Projectid);

        self.fetch_page(query, page, per_page).await
    }

    async fn fetch_page(
        &self,
        query: Select<project::Entity>,
        page: u64,
        per_page: u64,
    ) -> Result<PageOf<Project>> {
        let paginator = query.paginate(&self.conn, per_page);
        let totals = paginator
            .num_items_and_pages()
            .await
            .context("Failed to count projects")?;
        let page = clamp_page(page, totals.number_of_pages);
        let rows = paginator
            .fetch_page(page - 1)
            .await
            .context("Failed to fetch project page")?;

        Ok(PageOf::new(
            rows.into_iter().map(Project::from).collect(),
            page,
            per_page,
            totals.number_of_items,
            totals.number_of_pages,
        ))
    }
}
