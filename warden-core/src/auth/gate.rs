use crate::domain::users::{Role, User};
use crate::error::AccountError;

/// Anything that carries a resolved role.
pub trait HasRole {
    fn role(&self) -> Role;
}

impl HasRole for User {
    fn role(&self) -> Role {
        self.role
    }
}

impl<T: HasRole + ?Sized> HasRole for &T {
    fn role(&self) -> Role {
        (**self).role()
    }
}

/// Authorization check for a single endpoint's allow-list.
///
/// Each endpoint builds its own gate; there is no shared policy table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: Vec<Role>,
}

impl RoleGate {
    pub fn require(allowed: &[Role]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    /// Pass the identity through unchanged when its role is allowed.
    pub fn check<I: HasRole>(&self, identity: I) -> Result<I, AccountError> {
        if self.permits(identity.role()) {
            Ok(identity)
        } else {
            Err(AccountError::Forbidden)
        }
    }
}
