pub mod prelude;

pub mod applied;
pub mod followers;
pub mod issued_ids;
pub mod likes;
pub mod location;
pub mod message;
pub mod misconduct;
pub mod project;
pub mod user;
