use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessLevel {
    ReadOnly,
    ReadWrite,
}

impl AccessLevel {
    pub fn from_write_flag(write: bool) -> Self {
        if write {
            AccessLevel::ReadWrite
        } else {
            AccessLevel::ReadOnly
        }
    }
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AccessLevel::ReadOnly => "read-only",
            AccessLevel::ReadWrite => "read-write",
        })
    }
}

/// Access requested for a role on a schema.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PrivilegeGrant {
    pub role: String,
    pub schema: String,
    pub access: AccessLevel,
}

impl PrivilegeGrant {
    pub fn new(role: &str, schema: &str, access: AccessLevel) -> Self {
        Self {
            role: role.to_string(),
            schema: schema.to_string(),
            access,
        }
    }
}

/// What happened to one schema during a grant or revoke run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PrivilegeOutcome {
    Granted {
        schema: String,
        access: AccessLevel,
    },
    Revoked {
        schema: String,
    },
    RoleMissing,
    SchemaMissing {
        schema: String,
    },
}
