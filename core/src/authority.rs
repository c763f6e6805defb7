//! Who may press which control.

use crate::ids::RoleId;

/// Guild permissions relevant to ticket handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Full guild administrator. Implies every other permission.
    pub administrator: bool,
    /// May manage threads in the ticket channel.
    pub manage_threads: bool,
}

impl Permissions {
    /// No special permissions.
    pub const NONE: Self = Self {
        administrator: false,
        manage_threads: false,
    };

    /// Thread managers.
    pub const MANAGE_THREADS: Self = Self {
        administrator: false,
        manage_threads: true,
    };

    /// Administrators.
    pub const ADMINISTRATOR: Self = Self {
        administrator: true,
        manage_threads: true,
    };

    /// Effective manage-threads permission.
    #[must_use]
    pub const fn can_manage_threads(self) -> bool {
        self.administrator || self.manage_threads
    }
}

/// Authority levels required by the lifecycle transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Authority {
    /// Manage-threads permission or any staff role. Close and finalize.
    Manage,
    /// Manage-threads permission only. Reopen.
    Elevated,
    /// Administrator. Delete without logging.
    Administrator,
}

impl Authority {
    /// Whether a member with these permissions and roles holds this authority.
    #[must_use]
    pub fn permits(self, permissions: Permissions, roles: &[RoleId], staff_roles: &[RoleId]) -> bool {
        match self {
            Self::Manage => permissions.can_manage_threads() || is_staff(roles, staff_roles),
            Self::Elevated => permissions.can_manage_threads(),
            Self::Administrator => permissions.administrator,
        }
    }
}

/// Whether any of `roles` is a configured staff role.
#[must_use]
pub fn is_staff(roles: &[RoleId], staff_roles: &[RoleId]) -> bool {
    roles.iter().any(|r| staff_roles.contains(r))
}
