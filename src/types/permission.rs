use std::fmt;

use serde::{Deserialize, Serialize};

/// A single capability that can be requested on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Admin,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Read, Capability::Write, Capability::Admin];

    #[must_use]
    pub const fn as_permission(self) -> Permission {
        match self {
            Capability::Read => Permission::READ,
            Capability::Write => Permission::WRITE,
            Capability::Admin => Permission::ADMIN,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Admin => "admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission represents a bitmask of repository capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

impl Permission {
    pub const READ: Permission = Permission(1 << 0); // 1
    pub const WRITE: Permission = Permission(1 << 1); // 2
    pub const ADMIN: Permission = Permission(1 << 2); // 4

    /// Builds a bitmask from individual flags, with implied capabilities added.
    #[must_use]
    pub fn from_flags(read: bool, write: bool, admin: bool) -> Permission {
        let mut p = Permission::default();
        if read {
            p = p.union(Self::READ);
        }
        if write {
            p = p.union(Self::WRITE);
        }
        if admin {
            p = p.union(Self::ADMIN);
        }
        p.expand_implied()
    }

    /// Returns true if this permission bitmask contains the required permission.
    #[must_use]
    pub const fn has(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn allows(self, capability: Capability) -> bool {
        self.has(capability.as_permission())
    }

    /// Combines two permission bitmasks.
    #[must_use]
    pub const fn union(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }

    /// Expands a permission bitmask to include implied permissions.
    /// admin implies write implies read.
    #[must_use]
    pub fn expand_implied(self) -> Permission {
        let mut result = self.0;

        if self.has(Self::ADMIN) {
            result |= Self::WRITE.0;
        }
        if Permission(result).has(Self::WRITE) {
            result |= Self::READ.0;
        }

        Permission(result)
    }

    /// Returns a slice of capability strings for this bitmask.
    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .map(Capability::as_str)
            .collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<i64> for Permission {
    fn from(bits: i64) -> Self {
        Self(bits as u32)
    }
}

impl From<Permission> for i64 {
    fn from(p: Permission) -> Self {
        p.0 as i64
    }
}
