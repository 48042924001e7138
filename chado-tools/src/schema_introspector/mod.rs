use tracing::instrument;
use crate::identifier::{Identifier, QualifiedName};
use crate::postgres_client_wrapper::{Params, PostgresClientWrapper};
use crate::Result;

mod table_descriptors;
#[cfg(test)]
mod tests;

//language=postgresql
const SCHEMA_EXISTS_QUERY: &str = r#"
select exists(select 1 from pg_catalog.pg_namespace where nspname = $1);
"#;

//language=postgresql
const TABLE_EXISTS_QUERY: &str = r#"
select exists(select 1
              from pg_catalog.pg_class c
                       join pg_catalog.pg_namespace n on n.oid = c.relnamespace
              where n.nspname = $1
                and c.relname = $2
                and c.relkind in ('r', 'p'));
"#;

//language=postgresql
const TABLE_INHERITS_QUERY: &str = r#"
select exists(select 1
              from pg_catalog.pg_inherits i
                       join pg_catalog.pg_class child on child.oid = i.inhrelid
                       join pg_catalog.pg_namespace child_ns on child_ns.oid = child.relnamespace
                       join pg_catalog.pg_class parent on parent.oid = i.inhparent
                       join pg_catalog.pg_namespace parent_ns on parent_ns.oid = parent.relnamespace
              where child_ns.nspname = $1
                and child.relname = $2
                and parent_ns.nspname = $3
                and parent.relname = $4);
"#;

//language=postgresql
const TRIGGER_EXISTS_QUERY: &str = r#"
select exists(select 1
              from pg_catalog.pg_trigger t
                       join pg_catalog.pg_class c on c.oid = t.tgrelid
                       join pg_catalog.pg_namespace n on n.oid = c.relnamespace
              where n.nspname = $1
                and t.tgname = $2
                and not t.tgisinternal);
"#;

//language=postgresql
const FUNCTION_EXISTS_QUERY: &str = r#"
select exists(select 1
              from pg_catalog.pg_proc p
                       join pg_catalog.pg_namespace n on n.oid = p.pronamespace
              where n.nspname = $1
                and p.proname = $2);
"#;

//language=postgresql
const ROLE_EXISTS_QUERY: &str = r#"
select exists(select 1 from pg_catalog.pg_roles where rolname = $1);
"#;

/// Answers existence and shape questions about the connected database.
///
/// Every check validates the names it is given before a query is issued, and only ever passes
/// them to Postgres as bind parameters.
#[derive(Clone, Copy)]
pub struct SchemaIntrospector<'a> {
    connection: &'a PostgresClientWrapper,
}

impl<'a> SchemaIntrospector<'a> {
    pub fn new(connection: &'a PostgresClientWrapper) -> Self {
        SchemaIntrospector { connection }
    }

    async fn exists(&self, sql: &str, params: &Params<'_>) -> Result<bool> {
        let exists = self.connection.get_single_result_with_params(sql, params).await?;
        Ok(exists)
    }

    #[instrument(skip(self))]
    pub async fn schema_exists(&self, name: &str) -> Result<bool> {
        let schema = Identifier::schema(name)?;

        self.exists(SCHEMA_EXISTS_QUERY, &[&schema.as_str()]).await
    }

    #[instrument(skip(self))]
    pub async fn table_exists(&self, name: &str, schema: &str) -> Result<bool> {
        let table = Identifier::table(name)?;
        let schema = Identifier::schema(schema)?;

        self.exists(TABLE_EXISTS_QUERY, &[&schema.as_str(), &table.as_str()]).await
    }

    /// Checks if `child` directly inherits from `parent`. Both are `schema.table` names.
    ///
    /// Missing tables simply don't inherit from anything.
    #[instrument(skip(self))]
    pub async fn table_inherits(&self, child: &str, parent: &str) -> Result<bool> {
        let child = QualifiedName::parse(child)?;
        let parent = QualifiedName::parse(parent)?;

        self.exists(
            TABLE_INHERITS_QUERY,
            &[&child.schema.as_str(), &child.name.as_str(), &parent.schema.as_str(), &parent.name.as_str()],
        ).await
    }

    /// Checks for a user defined trigger on any table in `schema`.
    #[instrument(skip(self))]
    pub async fn trigger_exists(&self, schema: &str, trigger_name: &str) -> Result<bool> {
        let schema = Identifier::schema(schema)?;
        let trigger = Identifier::trigger(trigger_name)?;

        self.exists(TRIGGER_EXISTS_QUERY, &[&schema.as_str(), &trigger.as_str()]).await
    }

    #[instrument(skip(self))]
    pub async fn function_exists(&self, schema: &str, function_name: &str) -> Result<bool> {
        let schema = Identifier::schema(schema)?;
        let function = Identifier::function(function_name)?;

        self.exists(FUNCTION_EXISTS_QUERY, &[&schema.as_str(), &function.as_str()]).await
    }

    /// Checks for a role, whether it can log in or not.
    #[instrument(skip(self))]
    pub async fn role_exists(&self, name: &str) -> Result<bool> {
        let role = Identifier::role(name)?;

        self.exists(ROLE_EXISTS_QUERY, &[&role.as_str()]).await
    }
}
