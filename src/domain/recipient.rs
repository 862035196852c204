use crate::domain::access::Owned;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub comment: String,
    pub created_at: Option<OffsetDateTime>,
}

impl Owned for Recipient {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}
