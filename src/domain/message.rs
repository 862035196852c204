use crate::domain::access::Owned;
use time::OffsetDateTime;
use uuid::Uuid;

/// Subject and body sent by a mailing.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject: String,
    pub body: String,
    pub created_at: Option<OffsetDateTime>,
}

impl Owned for Message {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}
