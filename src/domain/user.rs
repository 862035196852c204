use crate::domain::access::Owned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub(crate) password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: Option<OffsetDateTime>,
}

/// A user's profile is owned by the user itself.
impl Owned for User {
    fn owner_id(&self) -> Uuid {
        self.id
    }
}

/// Named permissions. The string forms are the codenames stored in `user_permissions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CanDisableMailing,
    CanViewAllMailings,
    CanManageMessages,
    CanManageRecipients,
    CanViewUsers,
    CanBlockUsers,
}

impl Permission {
    pub const ALL: [Self; 6] = [
        Self::CanDisableMailing,
        Self::CanViewAllMailings,
        Self::CanManageMessages,
        Self::CanManageRecipients,
        Self::CanViewUsers,
        Self::CanBlockUsers,
    ];

    #[must_use]
    pub const fn codename(self) -> &'static str {
        match self {
            Self::CanDisableMailing => "can_disable_mailing",
            Self::CanViewAllMailings => "can_view_all_mailings",
            Self::CanManageMessages => "can_manage_messages",
            Self::CanManageRecipients => "can_manage_recipients",
            Self::CanViewUsers => "can_view_users",
            Self::CanBlockUsers => "can_block_users",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|p| p.codename() == s).ok_or_else(|| format!("Unknown permission: {s}"))
    }
}

/// A named bundle of permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Managers,
}

impl Role {
    #[must_use]
    pub const fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Managers => &Permission::ALL,
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "managers" => Ok(Self::Managers),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// The principal a request is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    user_id: Option<Uuid>,
    is_staff: bool,
    permissions: BTreeSet<Permission>,
}

impl Actor {
    #[must_use]
    pub fn authenticated(user_id: Uuid, is_staff: bool, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self { user_id: Some(user_id), is_staff, permissions: permissions.into_iter().collect() }
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user_id: None, is_staff: false, permissions: BTreeSet::new() }
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.is_staff
    }

    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    #[must_use]
    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}
