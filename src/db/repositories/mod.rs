pub mod application;
pub mod follow;
pub mod ids;
pub mod likes;
pub mod location;
pub mod message;
pub mod misconduct;
pub mod project;
pub mod user;
