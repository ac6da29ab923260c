pub mod prelude;

pub mod institutes;
pub mod points_of_contact;
pub mod project_users;
pub mod projects;
pub mod requests;
pub mod safe_tickets;
pub mod users;
