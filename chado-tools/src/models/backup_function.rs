use crate::identifier::Identifier;
use crate::quoting::IdentifierQuoter;
use crate::statements::{create_counting_function, DdlStatement, TypedVariable};

/// A plpgsql function returning the number of rows it processed as a `bigint`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BackupFunctionDescriptor {
    pub schema: Identifier,
    pub name: Identifier,
    pub parameters: Vec<TypedVariable>,
    pub locals: Vec<TypedVariable>,
    pub body: String,
}

impl BackupFunctionDescriptor {
    pub fn get_create_statement(&self, identifier_quoter: &IdentifierQuoter) -> DdlStatement {
        create_counting_function(
            &self.schema,
            &self.name,
            &self.parameters,
            &self.locals,
            &self.body,
            identifier_quoter,
        )
    }
}
