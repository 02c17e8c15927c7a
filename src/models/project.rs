use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::Serialize;

use crate::entities::project;
use crate::models::user::split_semicolons;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub projectid: String,
    pub userid: String,
    pub name: String,
    pub fields: String,
    pub members_required: Option<i32>,
    pub members: Option<i32>,
    pub member_list: Option<String>,
    pub project_description: Option<String>,
    pub owner: bool,
    pub channel: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<project::Model> for Project {
    fn from(model: project::Model) -> Self {
        Self {
            projectid: model.projectid,
            userid: model.userid,
            name: model.name,
            fields: model.fields,
            members_required: model.members_required,
            members: model.members,
            member_list: model.member_list,
            project_description: model.project_description,
            owner: model.owner,
            channel: model.channel,
            timestamp: model.timestamp,
        }
    }
}

impl Project {
    /// Fields covered by the project, split on `;`
    #[must_use]
    pub fn field_list(&self) -> Vec<String> {
        split_semicolons(Some(&self.fields))
    }

    /// Usernames in `member_list`. The placeholder text used before anyone
    /// joins does not count as a member.
    #[must_use]
    pub fn member_names(&self) -> Vec<String> {
        if self.member_list.as_deref() == Some(crate::constants::defaults::MEMBER_LIST) {
            return Vec::new();
        }
        split_semicolons(self.member_list.as_deref())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        match (self.members, self.members_required) {
            (Some(members), Some(required)) => members >= required,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub projectid: String,
    pub userid: String,
    pub name: String,
    pub fields: String,
    /// Optional fields applied right after creation
    pub details: ProjectPatch,
    /// Overrides the creation time, mainly for tests and imports
    pub timestamp: Option<DateTime<Utc>>,
}

/// Sparse update of a project row. Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub fields: Option<String>,
    pub members_required: Option<i32>,
    pub members: Option<i32>,
    pub member_list: Option<String>,
    pub project_description: Option<String>,
    pub channel: Option<String>,
}

impl ProjectPatch {
    pub fn apply(self, active: &mut project::ActiveModel) {
        if let Some(name) = self.name {
            active.name = Set(name);
        }
        if let Some(fields) = self.fields {
            active.fields = Set(fields);
        }
        if let Some(members_required) = self.members_required {
            active.members_required = Set(Some(members_required));
        }
        if let Some(members) = self.members {
            active.members = Set(Some(members));
        }
        if let Some(member_list) = self.member_list {
            active.member_list = Set(Some(member_list));
        }
        if let Some(project_description) = self.project_description {
            active.project_description = Set(Some(project_description));
        }
        if let Some(channel) = self.channel {
            active.channel = Set(Some(channel));
        }
    }
}
