use std::collections::HashMap;
use tracing::{debug, info, instrument};
use crate::identifier::{Identifier, IdentifierKind};
use crate::models::{AuditTableDescriptor, TableDescriptor, TriggerDescriptor, AUDIT_ID_SEQUENCE};
use crate::postgres_client_wrapper::PostgresClientWrapper;
use crate::privileges::AUDIT_SCHEMA;
use crate::quoting::IdentifierQuoter;
use crate::schema_introspector::SchemaIntrospector;
use crate::statements;
use crate::statements::DdlStatement;
use crate::Result;

mod function;
mod ordering;

pub use function::generic_audit_function;
pub use ordering::inheritance_order;

/// The table every root audit table inherits from.
pub const MASTER_TABLE: &str = "audit";

/// Generates the audit schema for a set of source tables.
///
/// Every step checks the catalog before changing anything, so the whole sequence can be rerun
/// against a database in any intermediate state.
pub struct AuditSchemaBuilder<'a> {
    connection: &'a PostgresClientWrapper,
    introspector: SchemaIntrospector<'a>,
    identifier_quoter: &'a IdentifierQuoter,
}

impl<'a> AuditSchemaBuilder<'a> {
    pub fn new(connection: &'a PostgresClientWrapper, identifier_quoter: &'a IdentifierQuoter) -> Self {
        AuditSchemaBuilder {
            connection,
            introspector: SchemaIntrospector::new(connection),
            identifier_quoter,
        }
    }

    fn audit_schema() -> Result<Identifier> {
        Identifier::schema(AUDIT_SCHEMA)
    }

    /// Runs every step in dependency order: schema, master table, audit tables, inheritance,
    /// then triggers.
    #[instrument(skip_all)]
    pub async fn create(&self, source_tables: &[TableDescriptor]) -> Result<Vec<AuditTableDescriptor>> {
        // Fail on cycles before touching the database.
        let ordered = inheritance_order(source_tables)?;

        self.create_schema().await?;
        self.create_master_table().await?;
        let audit_tables = self.create_audit_tables(source_tables).await?;

        for table in ordered {
            self.setup_inheritance(table, source_tables).await?;
        }

        self.create_audit_triggers(source_tables).await?;

        info!(tables = audit_tables.len(), "Audit schema is up to date");

        Ok(audit_tables)
    }

    /// Creates the audit schema if it is missing, and the sequence audit ids are drawn from.
    #[instrument(skip_all)]
    pub async fn create_schema(&self) -> Result {
        let schema = Self::audit_schema()?;

        if self.introspector.schema_exists(AUDIT_SCHEMA).await? {
            debug!("Audit schema already exists");
        } else {
            self.connection.execute_ddl(&statements::create_schema(&schema, self.identifier_quoter)).await?;
            info!(schema = AUDIT_SCHEMA, "Created audit schema");
        }

        let sequence = Identifier::new(IdentifierKind::Sequence, AUDIT_ID_SEQUENCE)?;
        self.connection.execute_ddl(&statements::create_sequence(&schema, &sequence, self.identifier_quoter)).await?;

        Ok(())
    }

    /// Creates `audit.audit`, which only holds the bookkeeping columns.
    #[instrument(skip_all)]
    pub async fn create_master_table(&self) -> Result<AuditTableDescriptor> {
        let master = AuditTableDescriptor::master(AUDIT_SCHEMA, MASTER_TABLE, self.identifier_quoter);
        self.create_table_if_missing(&master).await?;

        Ok(master)
    }

    /// Derives the audit table of each source table, and creates the ones that don't exist yet.
    ///
    /// Existing audit tables are left as they are, even if their source table changed since.
    /// The descriptors are returned with parents before children.
    #[instrument(skip_all)]
    pub async fn create_audit_tables(&self, source_tables: &[TableDescriptor]) -> Result<Vec<AuditTableDescriptor>> {
        let ordered = inheritance_order(source_tables)?;

        let mut audit_tables: Vec<AuditTableDescriptor> = Vec::with_capacity(ordered.len());
        let mut positions = HashMap::new();

        for source in ordered {
            let parent = source
                .parent
                .as_ref()
                .and_then(|p| positions.get(p))
                .map(|idx: &usize| &audit_tables[*idx]);

            let audit_table = AuditTableDescriptor::from_source(source, AUDIT_SCHEMA, parent, self.identifier_quoter);
            self.create_table_if_missing(&audit_table).await?;

            positions.insert(source.qualified_name(), audit_tables.len());
            audit_tables.push(audit_table);
        }

        Ok(audit_tables)
    }

    async fn create_table_if_missing(&self, audit_table: &AuditTableDescriptor) -> Result {
        if self.introspector.table_exists(&audit_table.name, &audit_table.schema).await? {
            debug!(table = %audit_table.qualified_name(), "Audit table already exists");
            return Ok(());
        }

        let statement = audit_table.get_create_statement(self.identifier_quoter)?;
        self.connection.execute_ddl(&statement).await?;
        info!(table = %audit_table.qualified_name(), "Created audit table");

        Ok(())
    }

    /// Makes the audit table of `source_table` inherit the audit table of its parent.
    ///
    /// The parent is looked up in `candidate_parents`. A table without a source parent inherits
    /// the master table instead. Nothing happens if the source parent is not among the
    /// candidates, if either audit table is missing, or if the inheritance is already in place.
    #[instrument(skip_all, fields(table = %source_table.qualified_name()))]
    pub async fn setup_inheritance(&self, source_table: &TableDescriptor, candidate_parents: &[TableDescriptor]) -> Result {
        let parent_name = match &source_table.parent {
            None => MASTER_TABLE,
            Some(parent) => match candidate_parents.iter().find(|c| c.qualified_name() == *parent) {
                Some(candidate) => candidate.name.as_str(),
                None => {
                    debug!(parent = %parent, "Parent is not being audited, skipping inheritance");
                    return Ok(());
                }
            },
        };

        if parent_name == source_table.name {
            return Ok(());
        }

        if !self.introspector.table_exists(&source_table.name, AUDIT_SCHEMA).await? {
            debug!("Audit table does not exist yet, skipping inheritance");
            return Ok(());
        }

        if !self.introspector.table_exists(parent_name, AUDIT_SCHEMA).await? {
            debug!(parent = parent_name, "Parent audit table does not exist yet, skipping inheritance");
            return Ok(());
        }

        let child_qualified = format!("{AUDIT_SCHEMA}.{}", source_table.name);
        let parent_qualified = format!("{AUDIT_SCHEMA}.{parent_name}");

        if self.introspector.table_inherits(&child_qualified, &parent_qualified).await? {
            debug!(parent = parent_name, "Inheritance already in place");
            return Ok(());
        }

        let schema = Self::audit_schema()?;
        let statement = statements::alter_table_inherit(
            &schema,
            &Identifier::table(&source_table.name)?,
            &schema,
            &Identifier::table(parent_name)?,
            self.identifier_quoter,
        );
        self.connection.execute_ddl(&statement).await?;
        info!(child = %child_qualified, parent = %parent_qualified, "Audit table now inherits its parent");

        Ok(())
    }

    /// Wraps a body from [`generic_audit_function`] into a trigger function.
    pub fn create_trigger_function(&self, schema: &str, name: &str, body: &str) -> Result<DdlStatement> {
        Ok(statements::create_trigger_function(
            &Identifier::schema(schema)?,
            &Identifier::function(name)?,
            body,
            self.identifier_quoter,
        ))
    }

    pub fn create_generic_trigger(
        &self,
        name: &str,
        function_schema: &str,
        function_name: &str,
        table_schema: &str,
        table_name: &str,
    ) -> Result<DdlStatement> {
        let trigger = TriggerDescriptor {
            name: Identifier::trigger(name)?,
            table_schema: Identifier::schema(table_schema)?,
            table_name: Identifier::table(table_name)?,
            function_schema: Identifier::schema(function_schema)?,
            function_name: Identifier::function(function_name)?,
        };

        Ok(trigger.get_create_statement(self.identifier_quoter))
    }

    /// Attaches a capturing trigger to every source table.
    ///
    /// Functions are always replaced, so changes to the column list are picked up. They run as
    /// their owner, since roles writing to source tables only get read access to the audit
    /// schema. Triggers are only created when missing.
    #[instrument(skip_all)]
    pub async fn create_audit_triggers(&self, source_tables: &[TableDescriptor]) -> Result {
        for source in source_tables {
            let function_name = trigger_function_name(source);
            let trigger_name = trigger_name(source);

            let columns = source
                .columns
                .iter()
                .map(|c| Identifier::column(&c.name))
                .collect::<Result<Vec<_>>>()?;

            let body = generic_audit_function(
                &Self::audit_schema()?,
                &Identifier::table(&source.name)?,
                &columns,
                self.identifier_quoter,
            );

            let function = self.create_trigger_function(AUDIT_SCHEMA, &function_name, &body)?;
            let secure = statements::secure_function(&Self::audit_schema()?, &Identifier::function(&function_name)?, self.identifier_quoter);
            self.connection.execute_ddl_batch(&[function, secure]).await?;

            if self.introspector.trigger_exists(&source.schema, &trigger_name).await? {
                debug!(table = %source.qualified_name(), trigger = %trigger_name, "Audit trigger already exists");
                continue;
            }

            let trigger = self.create_generic_trigger(&trigger_name, AUDIT_SCHEMA, &function_name, &source.schema, &source.name)?;
            self.connection.execute_ddl(&trigger).await?;
            info!(table = %source.qualified_name(), trigger = %trigger_name, "Created audit trigger");
        }

        Ok(())
    }
}

/// `<schema>_<table>_proc`, living in the audit schema.
pub fn trigger_function_name(source: &TableDescriptor) -> String {
    format!("{}_{}_proc", source.schema, source.name)
}

/// `<table>_audit_tr`, attached to the source table.
pub fn trigger_name(source: &TableDescriptor) -> String {
    format!("{}_audit_tr", source.name)
}
