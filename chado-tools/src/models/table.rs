use serde::{Deserialize, Serialize};
use crate::default;
use crate::identifier::QualifiedName;
use crate::models::column::ColumnDescriptor;

/// A table of the source schema, with everything needed to mirror it into the audit schema.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    pub parent: Option<QualifiedName>,
}

impl TableDescriptor {
    pub fn new(schema: &str, name: &str) -> Self {
        TableDescriptor {
            schema: schema.to_string(),
            name: name.to_string(),
            ..default()
        }
    }

    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }

    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}
