pub mod delivery;
pub mod mailing;
pub mod message;
pub mod recipient;
pub mod user;

pub use delivery::DeliveryAttemptRecord;
pub use mailing::MailingRecord;
pub use message::MessageRecord;
pub use recipient::RecipientRecord;
pub use user::UserRecord;
