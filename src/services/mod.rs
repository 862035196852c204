pub mod account_service;
pub mod auth_service;
pub mod delivery_service;
pub mod health_service;
pub mod lifecycle_service;
pub mod mailing_service;
pub mod message_service;
pub mod rate_limit_service;
pub mod recipient_service;
pub mod stats_service;
pub mod user_service;
