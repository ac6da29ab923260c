pub use super::institutes::Entity as Institutes;
pub use super::points_of_contact::Entity as PointsOfContact;
pub use super::project_users::Entity as ProjectUsers;
pub use super::projects::Entity as Projects;
pub use super::requests::Entity as Requests;
pub use super::safe_tickets::Entity as SafeTickets;
pub use super::users::Entity as Users;
