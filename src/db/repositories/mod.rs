pub mod contact;
pub mod institute;
pub mod project;
pub mod request;
pub mod ticket;
pub mod user;
