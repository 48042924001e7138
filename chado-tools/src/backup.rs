use tracing::{debug, info, instrument, warn};
use crate::identifier::{Identifier, IdentifierKind};
use crate::models::{AuditTableDescriptor, BackupFunctionDescriptor, AUDIT_TIME_COLUMN};
use crate::postgres_client_wrapper::PostgresClientWrapper;
use crate::privileges::{AUDIT_BACKUP_SCHEMA, AUDIT_SCHEMA};
use crate::quoting::{AttemptedKeywordUsage, IdentifierQuoter};
use crate::schema_introspector::SchemaIntrospector;
use crate::statements;
use crate::statements::{DdlStatement, TypedVariable};
use crate::{ChadoToolsError, Result};

pub const BACKUP_FUNCTION: &str = "backup_audit_tables";

const CUTOFF_PARAMETER: &str = "cutoff";
const MOVED_VARIABLE: &str = "moved";
const TOTAL_VARIABLE: &str = "total";
const ARCHIVED_ROWS: &str = "archived";

/// Archives audit rows older than a cutoff date into the backup schema.
pub struct BackupFunctionManager<'a> {
    connection: &'a PostgresClientWrapper,
    introspector: SchemaIntrospector<'a>,
    identifier_quoter: &'a IdentifierQuoter,
}

impl<'a> BackupFunctionManager<'a> {
    pub fn new(connection: &'a PostgresClientWrapper, identifier_quoter: &'a IdentifierQuoter) -> Self {
        BackupFunctionManager {
            connection,
            introspector: SchemaIntrospector::new(connection),
            identifier_quoter,
        }
    }

    /// Wraps `body` into a function taking the cutoff date as text and returning a row count.
    pub fn backup_function_wrapper(&self, schema: &str, name: &str, locals: Vec<TypedVariable>, body: &str) -> Result<DdlStatement> {
        let function = BackupFunctionDescriptor {
            schema: Identifier::schema(schema)?,
            name: Identifier::function(name)?,
            parameters: vec![TypedVariable::new(Identifier::new(IdentifierKind::Column, CUTOFF_PARAMETER)?, "text")],
            locals,
            body: body.to_string(),
        };

        Ok(function.get_create_statement(self.identifier_quoter))
    }

    /// Creates the backup schema, one backup table per audit table, and the backup function.
    ///
    /// The audit schema has to exist already. Backup tables that exist are kept, the function
    /// is always replaced so it covers exactly `audit_tables`.
    #[instrument(skip_all)]
    pub async fn create(&self, audit_tables: &[AuditTableDescriptor]) -> Result {
        if !self.introspector.schema_exists(AUDIT_SCHEMA).await? {
            return Err(ChadoToolsError::MissingPrerequisite {
                kind: IdentifierKind::Schema,
                name: AUDIT_SCHEMA.to_string(),
            });
        }

        let backup_schema = Identifier::schema(AUDIT_BACKUP_SCHEMA)?;
        let audit_schema = Identifier::schema(AUDIT_SCHEMA)?;

        if self.introspector.schema_exists(AUDIT_BACKUP_SCHEMA).await? {
            debug!("Backup schema already exists");
        } else {
            self.connection.execute_ddl(&statements::create_schema(&backup_schema, self.identifier_quoter)).await?;
            info!(schema = AUDIT_BACKUP_SCHEMA, "Created backup schema");
        }

        for table in audit_tables {
            if self.introspector.table_exists(&table.name, AUDIT_BACKUP_SCHEMA).await? {
                debug!(table = %table.name, "Backup table already exists");
                continue;
            }

            let name = Identifier::table(&table.name)?;
            let statement = statements::create_table_like(&backup_schema, &name, &audit_schema, &name, self.identifier_quoter);
            self.connection.execute_ddl(&statement).await?;
            info!(table = %table.name, "Created backup table");
        }

        let body = backup_body(audit_tables, self.identifier_quoter)?;
        let locals = vec![
            TypedVariable::new(Identifier::new(IdentifierKind::Column, MOVED_VARIABLE)?, "bigint"),
            TypedVariable::new(Identifier::new(IdentifierKind::Column, TOTAL_VARIABLE)?, "bigint").with_initial_value("0"),
        ];
        let function = self.backup_function_wrapper(AUDIT_BACKUP_SCHEMA, BACKUP_FUNCTION, locals, &body)?;
        self.connection.execute_ddl(&function).await?;
        info!(tables = audit_tables.len(), "Created backup function");

        Ok(())
    }

    /// Runs the backup function for `date`, returning how many rows were archived.
    ///
    /// Returns `None` without doing anything when the backup function has not been created.
    #[instrument(skip(self))]
    pub async fn execute_backup_function(&self, date: &str) -> Result<Option<i64>> {
        if !self.introspector.function_exists(AUDIT_BACKUP_SCHEMA, BACKUP_FUNCTION).await? {
            warn!("Backup function does not exist, nothing archived. Set up the audit backup schema first");
            return Ok(None);
        }

        let sql = format!(
            "select {}($1::text)",
            self.identifier_quoter.quote_qualified(AUDIT_BACKUP_SCHEMA, BACKUP_FUNCTION, AttemptedKeywordUsage::TypeOrFunctionName)
        );
        let moved: i64 = self.connection.call_function(&sql, &[&date]).await?;
        info!(date, moved, "Archived audit rows");

        Ok(Some(moved))
    }
}

/// Moves rows older than the cutoff table by table, counting what was moved.
///
/// Each table is moved by a single statement, so rows committed while the function runs are
/// either moved or left in place.
fn backup_body(audit_tables: &[AuditTableDescriptor], identifier_quoter: &IdentifierQuoter) -> Result<String> {
    let mut body = String::new();

    for table in audit_tables {
        let name = Identifier::table(&table.name)?;
        let source = identifier_quoter.quote_qualified(AUDIT_SCHEMA, &name, AttemptedKeywordUsage::Other);
        let target = identifier_quoter.quote_qualified(AUDIT_BACKUP_SCHEMA, &name, AttemptedKeywordUsage::Other);
        let filter = format!("{AUDIT_TIME_COLUMN} < {CUTOFF_PARAMETER}::date");

        body.push_str(&format!(
            "WITH {ARCHIVED_ROWS} AS (DELETE FROM ONLY {source} WHERE {filter} RETURNING *) INSERT INTO {target} SELECT * FROM {ARCHIVED_ROWS};\n"
        ));
        body.push_str(&format!("GET DIAGNOSTICS {MOVED_VARIABLE} = ROW_COUNT;\n"));
        body.push_str(&format!("{TOTAL_VARIABLE} := {TOTAL_VARIABLE} + {MOVED_VARIABLE};\n"));
    }

    body.push_str(&format!("RETURN {TOTAL_VARIABLE}"));

    Ok(body)
}
