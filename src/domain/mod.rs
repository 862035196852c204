pub mod access;
pub mod auth;
pub mod delivery;
pub mod mailing;
pub mod message;
pub mod page;
pub mod recipient;
pub mod stats;
pub mod user;
