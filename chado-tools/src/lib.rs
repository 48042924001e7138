#[cfg(any(test, feature = "test_utilities"))]
pub mod test_helpers;

mod postgres_client_wrapper;
mod schema_introspector;
mod models;
mod error;
mod quoting;
mod identifier;
mod statements;
mod ddl_query_builder;
mod privileges;
mod audit;
mod backup;

pub use error::*;
pub use models::*;
pub use identifier::*;
pub use postgres_client_wrapper::PostgresClientWrapper;
pub use quoting::IdentifierQuoter;
pub use schema_introspector::SchemaIntrospector;
pub use statements::{DdlStatement, TypedVariable};
pub use privileges::*;
pub use audit::*;
pub use backup::*;

pub(crate) fn default<T: Default>() -> T {
    T::default()
}
