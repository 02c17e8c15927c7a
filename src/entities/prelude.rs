pub use super::applied::Entity as Applied;
pub use super::followers::Entity as Followers;
pub use super::issued_ids::Entity as IssuedIds;
pub use super::likes::Entity as Likes;
pub use super::location::Entity as Location;
pub use super::message::Entity as Message;
pub use super::misconduct::Entity as Misconduct;
pub use super::project::Entity as Project;
pub use super::user::Entity as User;
