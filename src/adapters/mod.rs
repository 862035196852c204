pub mod database;
pub mod mail;
