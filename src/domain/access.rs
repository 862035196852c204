//! Request authorization.
//!
//! Every guarded operation is described by one [`AccessPolicy`]: whether the
//! resource owner is allowed, which named permissions grant access (and
//! whether any or all of them are needed), and how the coarse staff flag is
//! treated. Evaluation happens before the guarded operation touches anything
//! and a denial is always reported as [`AccessDenied`].

use crate::domain::user::{Actor, Permission};
use thiserror::Error;
use uuid::Uuid;

/// Resources with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Only the owner may access this resource")]
    NotOwner,
    #[error("Staff may not modify resources they do not own")]
    StaffNotOwner,
    #[error("Missing required permission: {0}")]
    MissingPermission(Permission),
    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionRequirement {
    None,
    /// Holding at least one of the set grants access.
    Any(&'static [Permission]),
    /// Every permission of the set must be held.
    All(&'static [Permission]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffMode {
    Ignored,
    /// Staff may read any resource.
    ReadOverride,
    /// Staff who are not the owner are rejected outright.
    DenyNonOwner,
}

/// Rows a list query may return for an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    OwnedBy(Uuid),
}

impl ListScope {
    #[must_use]
    pub const fn owner_filter(self) -> Option<Uuid> {
        match self {
            Self::All => None,
            Self::OwnedBy(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    owner_allowed: bool,
    permissions: PermissionRequirement,
    staff: StaffMode,
}

impl AccessPolicy {
    #[must_use]
    pub const fn owner_only() -> Self {
        Self { owner_allowed: true, permissions: PermissionRequirement::None, staff: StaffMode::Ignored }
    }

    #[must_use]
    pub const fn owner_or_permission(any_of: &'static [Permission]) -> Self {
        Self { owner_allowed: true, permissions: PermissionRequirement::Any(any_of), staff: StaffMode::Ignored }
    }

    #[must_use]
    pub const fn owner_or_staff_read() -> Self {
        Self { owner_allowed: true, permissions: PermissionRequirement::None, staff: StaffMode::ReadOverride }
    }

    #[must_use]
    pub const fn owner_only_edit() -> Self {
        Self { owner_allowed: true, permissions: PermissionRequirement::None, staff: StaffMode::DenyNonOwner }
    }

    /// An empty set only requires the actor to be authenticated.
    #[must_use]
    pub const fn global_permission(all_of: &'static [Permission]) -> Self {
        Self { owner_allowed: false, permissions: PermissionRequirement::All(all_of), staff: StaffMode::Ignored }
    }

    #[must_use]
    pub const fn authenticated() -> Self {
        Self::global_permission(&[])
    }

    /// Authorizes `actor` against a resource using its [`Owned`] owner.
    ///
    /// # Errors
    /// Returns the first reason access is refused.
    pub fn authorize<T: Owned + ?Sized>(&self, actor: &Actor, resource: &T) -> Result<(), AccessDenied> {
        self.check(actor, Some(resource.owner_id()))
    }

    /// Authorizes `actor` against a resource whose owner is read by `owner_of`.
    ///
    /// # Errors
    /// Returns the first reason access is refused.
    pub fn authorize_with<T: ?Sized>(
        &self,
        actor: &Actor,
        resource: &T,
        owner_of: impl FnOnce(&T) -> Uuid,
    ) -> Result<(), AccessDenied> {
        self.check(actor, Some(owner_of(resource)))
    }

    /// Authorizes an operation that is not tied to a single resource.
    ///
    /// # Errors
    /// Returns the first reason access is refused.
    pub fn authorize_global(&self, actor: &Actor) -> Result<(), AccessDenied> {
        self.check(actor, None)
    }

    /// Scope of list queries: everything for holders of a granting permission, otherwise the actor's own rows.
    ///
    /// # Errors
    /// Returns `AccessDenied::Unauthenticated` for anonymous actors.
    pub fn list_scope(&self, actor: &Actor) -> Result<ListScope, AccessDenied> {
        let user_id = actor.user_id().ok_or(AccessDenied::Unauthenticated)?;
        let unrestricted = match self.permissions {
            PermissionRequirement::None => false,
            PermissionRequirement::Any(set) => set.iter().any(|p| actor.has_permission(*p)),
            PermissionRequirement::All(set) => !set.is_empty() && set.iter().all(|p| actor.has_permission(*p)),
        };
        Ok(if unrestricted { ListScope::All } else { ListScope::OwnedBy(user_id) })
    }

    fn check(&self, actor: &Actor, owner: Option<Uuid>) -> Result<(), AccessDenied> {
        if !actor.is_authenticated() {
            return Err(AccessDenied::Unauthenticated);
        }

        let is_owner = self.owner_allowed && owner.is_some_and(|id| actor.is(id));

        match self.staff {
            StaffMode::DenyNonOwner if actor.is_staff() && !is_owner => return Err(AccessDenied::StaffNotOwner),
            StaffMode::ReadOverride if actor.is_staff() => return Ok(()),
            _ => {}
        }

        if is_owner {
            return Ok(());
        }

        match self.permissions {
            PermissionRequirement::Any(set) if set.iter().any(|p| actor.has_permission(*p)) => Ok(()),
            PermissionRequirement::All(set) if !self.owner_allowed => {
                match set.iter().find(|p| !actor.has_permission(**p)) {
                    Some(missing) => Err(AccessDenied::MissingPermission(*missing)),
                    None => Ok(()),
                }
            }
            PermissionRequirement::All(set) if !set.is_empty() && set.iter().all(|p| actor.has_permission(*p)) => {
                Ok(())
            }
            PermissionRequirement::Any(_) => Err(AccessDenied::InsufficientPermissions),
            _ => Err(AccessDenied::NotOwner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc {
        author: Uuid,
    }

    impl Owned for Doc {
        fn owner_id(&self) -> Uuid {
            self.author
        }
    }

    fn user(permissions: &[Permission]) -> Actor {
        Actor::authenticated(Uuid::new_v4(), false, permissions.iter().copied())
    }

    fn staff() -> Actor {
        Actor::authenticated(Uuid::new_v4(), true, [])
    }

    fn owned_by(actor: &Actor) -> Doc {
        Doc { author: actor.user_id().unwrap() }
    }

    #[test]
    fn test_owner_only() {
        let owner = user(&[]);
        let doc = owned_by(&owner);
        let policy = AccessPolicy::owner_only();

        assert_eq!(policy.authorize(&owner, &doc), Ok(()));
        assert_eq!(policy.authorize(&user(&[]), &doc), Err(AccessDenied::NotOwner));
        assert_eq!(policy.authorize(&staff(), &doc), Err(AccessDenied::NotOwner));
        assert_eq!(policy.authorize(&user(&Permission::ALL), &doc), Err(AccessDenied::NotOwner));
    }

    #[test]
    fn test_owner_or_permission_uses_any_semantics() {
        let owner = user(&[]);
        let doc = owned_by(&owner);
        let policy =
            AccessPolicy::owner_or_permission(&[Permission::CanManageRecipients, Permission::CanViewAllMailings]);

        assert_eq!(policy.authorize(&owner, &doc), Ok(()));
        assert_eq!(policy.authorize(&user(&[Permission::CanViewAllMailings]), &doc), Ok(()));
        assert_eq!(
            policy.authorize(&user(&[Permission::CanManageMessages]), &doc),
            Err(AccessDenied::InsufficientPermissions)
        );
        assert_eq!(policy.authorize(&staff(), &doc), Err(AccessDenied::InsufficientPermissions));
    }

    #[test]
    fn test_staff_read_and_owner_only_edit() {
        let owner = user(&[]);
        let doc = owned_by(&owner);
        let staff = staff();
        let stranger = user(&[]);
        let read = AccessPolicy::owner_or_staff_read();
        let edit = AccessPolicy::owner_only_edit();

        assert_eq!(read.authorize(&staff, &doc), Ok(()));
        assert_eq!(edit.authorize(&staff, &doc), Err(AccessDenied::StaffNotOwner));

        assert_eq!(read.authorize(&stranger, &doc), Err(AccessDenied::NotOwner));
        assert_eq!(edit.authorize(&stranger, &doc), Err(AccessDenied::NotOwner));

        assert_eq!(read.authorize(&owner, &doc), Ok(()));
        assert_eq!(edit.authorize(&owner, &doc), Ok(()));
    }

    #[test]
    fn test_staff_owner_may_edit_own_resource() {
        let staff = staff();
        let doc = owned_by(&staff);
        assert_eq!(AccessPolicy::owner_only_edit().authorize(&staff, &doc), Ok(()));
    }

    #[test]
    fn test_global_permission_uses_all_semantics() {
        let policy = AccessPolicy::global_permission(&[Permission::CanViewUsers, Permission::CanBlockUsers]);

        assert_eq!(policy.authorize_global(&user(&[Permission::CanViewUsers, Permission::CanBlockUsers])), Ok(()));
        assert_eq!(
            policy.authorize_global(&user(&[Permission::CanViewUsers])),
            Err(AccessDenied::MissingPermission(Permission::CanBlockUsers))
        );
        assert_eq!(policy.authorize_global(&Actor::anonymous()), Err(AccessDenied::Unauthenticated));
    }

    #[test]
    fn test_global_permission_ignores_ownership() {
        let owner = user(&[]);
        let doc = owned_by(&owner);
        let policy = AccessPolicy::global_permission(&[Permission::CanDisableMailing]);

        assert_eq!(
            policy.authorize(&owner, &doc),
            Err(AccessDenied::MissingPermission(Permission::CanDisableMailing))
        );
    }

    #[test]
    fn test_empty_permission_set_requires_only_authentication() {
        let policy = AccessPolicy::authenticated();
        assert_eq!(policy.authorize_global(&user(&[])), Ok(()));
        assert_eq!(policy.authorize_global(&Actor::anonymous()), Err(AccessDenied::Unauthenticated));
    }

    #[test]
    fn test_anonymous_denied_everywhere() {
        let doc = Doc { author: Uuid::new_v4() };
        let anonymous = Actor::anonymous();
        for policy in [
            AccessPolicy::owner_only(),
            AccessPolicy::owner_or_permission(&Permission::ALL),
            AccessPolicy::owner_or_staff_read(),
            AccessPolicy::owner_only_edit(),
            AccessPolicy::global_permission(&[]),
        ] {
            assert_eq!(policy.authorize(&anonymous, &doc), Err(AccessDenied::Unauthenticated));
        }
    }

    #[test]
    fn test_custom_owner_accessor() {
        let owner = user(&[]);
        let pair = (owner.user_id().unwrap(), "payload");
        let policy = AccessPolicy::owner_only();
        assert_eq!(policy.authorize_with(&owner, &pair, |p| p.0), Ok(()));
        assert_eq!(policy.authorize_with(&user(&[]), &pair, |p| p.0), Err(AccessDenied::NotOwner));
    }

    #[test]
    fn test_list_scope() {
        let policy = AccessPolicy::owner_or_permission(&[Permission::CanViewAllMailings]);
        let manager = user(&[Permission::CanViewAllMailings]);
        let regular = user(&[]);

        assert_eq!(policy.list_scope(&manager), Ok(ListScope::All));
        assert_eq!(policy.list_scope(&regular), Ok(ListScope::OwnedBy(regular.user_id().unwrap())));
        assert_eq!(policy.list_scope(&Actor::anonymous()), Err(AccessDenied::Unauthenticated));
    }
}
