use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use tracing::info;

use crate::constants::defaults;
use crate::db::unique_violation;
use crate::entities::{applied, project, user};
use crate::models::Application;

/// Outcome of accepting an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted,
    AlreadyAccepted,
    NotFound,
}

pub struct ApplicationRepository {
    conn: DatabaseConnection,
}

impl ApplicationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns false when `userid` already applied to `projectid`.
    pub async fn apply(
        &self,
        appliedid: &str,
        userid: &str,
        projectid: &str,
        body: Option<&str>,
    ) -> Result<bool> {
        let active = applied::ActiveModel {
            appliedid: Set(appliedid.to_string()),
            userid: Set(userid.to_string()),
            projectid: Set(projectid.to_string()),
            body: Set(body.map(ToString::to_string)),
            accepted: Set(false),
            timestamp: Set(Utc::now()),
        };

        match applied::Entity::insert(active).exec(&self.conn).await {
            Ok(_) => {}
            Err(e) if unique_violation(&e).is_some() => return Ok(false),
            Err(e) => return Err(e).context("Failed to insert application"),
        }

        info!("User {} applied to project {}", userid, projectid);
        Ok(true)
    }

    pub async fn has_applied(&self, userid: &str, projectid: &str) -> Result<bool> {
        let count = applied::Entity::find()
            .filter(applied::Column::Userid.eq(userid))
            .filter(applied::Column::Projectid.eq(projectid))
            .count(&self.conn)
            .await
            .context("Failed to query application")?;

        Ok(count > 0)
    }

    /// Whether `userid` has an accepted application on `projectid`.
    pub async fn is_member(&self, userid: &str, projectid: &str) -> Result<bool> {
        let count = applied::Entity::find()
            .filter(applied::Column::Userid.eq(userid))
            .filter(applied::Column::Projectid.eq(projectid))
            .filter(applied::Column::Accepted.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to query membership")?;

        Ok(count > 0)
    }

    pub async fn get(&self, appliedid: &str) -> Result<Option<applied::Model>> {
        applied::Entity::find_by_id(appliedid.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query application")
    }

    /// Applications to `projectid`, oldest first, with applicant usernames.
    pub async fn list_for_project(&self, projectid: &str) -> Result<Vec<Application>> {
        applied::Entity::find()
            .select_only()
            .columns([
                applied::Column::Appliedid,
                applied::Column::Userid,
                applied::Column::Projectid,
                applied::Column::Body,
                applied::Column::Accepted,
                applied::Column::Timestamp,
            ])
            .column(user::Column::Username)
            .join(JoinType::InnerJoin, applied::Relation::Member.def())
            .filter(applied::Column::Projectid.eq(projectid))
            .order_by_asc(applied::Column::Timestamp)
            .into_model::<Application>()
            .all(&self.conn)
            .await
            .context("Failed to list applications")
    }

    /// Marks the application accepted and adds the applicant to the
    /// project's member count and member list, in one transaction.
    pub async fn accept(&self, appliedid: &str) -> Result<AcceptOutcome> {
        let txn = self.conn.begin().await?;

        let Some(application) = applied::Entity::find_by_id(appliedid.to_string())
            .one(&txn)
            .await
            .context("Failed to query application")?
        else {
            return Ok(AcceptOutcome::NotFound);
        };

        if application.accepted {
            return Ok(AcceptOutcome::AlreadyAccepted);
        }

        let applicant = user::Entity::find_by_id(application.userid.clone())
            .one(&txn)
            .await
            .context("Failed to query applicant")?
            .ok_or_else(|| anyhow::anyhow!("Applicant {} vanished", application.userid))?;

        let Some(project_row) = project::Entity::find_by_id(application.projectid.clone())
            .one(&txn)
            .await
            .context("Failed to query project")?
        else {
            return Ok(AcceptOutcome::NotFound);
        };

        let member_list = match project_row.member_list.as_deref() {
            None | Some("") | Some(defaults::MEMBER_LIST) => applicant.username.clone(),
            Some(existing) => format!("{};{}", existing.trim_end_matches(';'), applicant.username),
        };
        let members = project_row.members.unwrap_or(0) + 1;

        let mut active_project = project_row.into_active_model();
        active_project.members = Set(Some(members));
        active_project.member_list = Set(Some(member_list));
        active_project
            .update(&txn)
            .await
            .context("Failed to update project members")?;

        let mut active_application = application.into_active_model();
        active_application.accepted = Set(true);
        active_application
            .update(&txn)
            .await
            .context("Failed to accept application")?;

        txn.commit().await?;

        info!("Accepted application {}", appliedid);
        Ok(AcceptOutcome::Accepted)
    }
}
