use thiserror::Error;
use crate::identifier::IdentifierKind;

#[derive(Error, Debug)]
pub enum ChadoToolsError {
    #[error("Error from postgres: `{0}`")]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Error from postgres: `{source}` when executing query: `{query}`")]
    PostgresErrorWithQuery {
        query: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("'{value}' is not a valid {kind} identifier")]
    InvalidIdentifier {
        kind: IdentifierKind,
        value: String,
    },

    #[error("Failed to read the database catalog: `{source}` when executing query: `{query}`")]
    CatalogAccessError {
        query: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("The {kind} '{name}' does not exist")]
    MissingPrerequisite {
        kind: IdentifierKind,
        name: String,
    },

    #[error("Postgres rejected the statement: `{source}` when executing: `{statement}`")]
    DdlExecutionError {
        statement: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("Table inheritance contains a cycle between: {tables:?}")]
    CyclicInheritance {
        tables: Vec<String>,
    },

    #[error("Table '{table}' inherits from more than one parent, which is not supported")]
    MultipleInheritance {
        table: String,
    },

    #[error("Invalid number of results returned from query. Expected `{expected}`, got `{actual}`")]
    InvalidNumberOfResults {
        actual: usize,
        expected: usize,
    },

    #[error("Unsupported Postgres version: {0}. Only Postgres 12 and newer is supported.")]
    UnsupportedPostgresVersion(i32),

    #[error("Postgres did not report a usable server version")]
    InvalidPostgresVersionResponse,
}

pub type Result<T = ()> = std::result::Result<T, ChadoToolsError>;
