use crate::identifier::Identifier;
use crate::quoting::IdentifierQuoter;
use crate::statements::{create_generic_trigger, DdlStatement};

/// A row level trigger firing after every insert, update and delete on a source table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TriggerDescriptor {
    pub name: Identifier,
    pub table_schema: Identifier,
    pub table_name: Identifier,
    pub function_schema: Identifier,
    pub function_name: Identifier,
}

impl TriggerDescriptor {
    pub fn get_create_statement(&self, identifier_quoter: &IdentifierQuoter) -> DdlStatement {
        create_generic_trigger(
            &self.name,
            &self.function_schema,
            &self.function_name,
            &self.table_schema,
            &self.table_name,
            identifier_quoter,
        )
    }
}
