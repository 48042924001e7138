use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::{ChadoToolsError, Result};

/// Postgres truncates identifiers longer than this, which would make existence checks lie.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// What an identifier names. Only used to produce better error messages.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IdentifierKind {
    Schema,
    Table,
    Column,
    Role,
    Trigger,
    Function,
    Sequence,
    Constraint,
}

impl Display for IdentifierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IdentifierKind::Schema => "schema",
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
            IdentifierKind::Role => "role",
            IdentifierKind::Trigger => "trigger",
            IdentifierKind::Function => "function",
            IdentifierKind::Sequence => "sequence",
            IdentifierKind::Constraint => "constraint",
        })
    }
}

/// A name that is known to be safe to embed in generated SQL.
///
/// Valid identifiers start with an ASCII letter or underscore, and continue with ASCII letters,
/// digits, underscores or dollar signs. Anything else is rejected rather than escaped, so
/// statement builders never see input that could break out of an identifier position.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(kind: IdentifierKind, value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref();

        if is_valid_identifier(value) {
            Ok(Identifier(value.to_string()))
        } else {
            Err(ChadoToolsError::InvalidIdentifier {
                kind,
                value: value.to_string(),
            })
        }
    }

    pub fn schema(value: impl AsRef<str>) -> Result<Self> {
        Self::new(IdentifierKind::Schema, value)
    }

    pub fn table(value: impl AsRef<str>) -> Result<Self> {
        Self::new(IdentifierKind::Table, value)
    }

    pub fn column(value: impl AsRef<str>) -> Result<Self> {
        Self::new(IdentifierKind::Column, value)
    }

    pub fn role(value: impl AsRef<str>) -> Result<Self> {
        Self::new(IdentifierKind::Role, value)
    }

    pub fn trigger(value: impl AsRef<str>) -> Result<Self> {
        Self::new(IdentifierKind::Trigger, value)
    }

    pub fn function(value: impl AsRef<str>) -> Result<Self> {
        Self::new(IdentifierKind::Function, value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();

    value.len() <= MAX_IDENTIFIER_LENGTH
        && matches!(chars.next(), Some('a'..='z' | 'A'..='Z' | '_'))
        && chars.all(|c| matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '$'))
}

/// A `schema.table` pair.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parses `schema.table`. A name without a schema part is rejected, as resolving it would
    /// depend on the `search_path` of the connection.
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once('.') {
            Some((schema, name)) => {
                Identifier::schema(schema)?;
                Identifier::table(name)?;
                Ok(Self::new(schema, name))
            }
            None => Err(ChadoToolsError::InvalidIdentifier {
                kind: IdentifierKind::Table,
                value: value.to_string(),
            }),
        }
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}
