pub mod attempts;
pub mod auth;
pub mod health;
pub mod mailings;
pub mod messages;
pub mod page;
pub mod recipients;
pub mod users;
