pub mod activity;
pub mod project;
pub mod user;

pub use activity::{Application, ChannelMessage, MisconductReport};
pub use project::{NewProject, Project, ProjectPatch};
pub use user::{LocationChange, NewUser, User, UserPatch};
