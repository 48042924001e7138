use serde::{Deserialize, Serialize};

/// A column of a source table, as read from the catalog.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// The type as rendered by `format_type`, e.g. `character varying(255)` or `text[]`.
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_nullable: true,
            default_value: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn with_default(mut self, expression: &str) -> Self {
        self.default_value = Some(expression.to_string());
        self
    }
}
