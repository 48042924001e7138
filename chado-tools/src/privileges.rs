use tracing::{info, instrument, warn};
use crate::identifier::Identifier;
use crate::models::{AccessLevel, PrivilegeGrant, PrivilegeOutcome};
use crate::postgres_client_wrapper::PostgresClientWrapper;
use crate::schema_introspector::SchemaIntrospector;
use crate::statements::{grant_on_all_sequences, grant_on_all_tables, grant_schema_usage, revoke_all_privileges, revoke_schema_usage, DdlStatement, SchemaObjects, SequencePrivilege, TablePrivilege};
use crate::Result;

pub const AUDIT_SCHEMA: &str = "audit";
pub const AUDIT_BACKUP_SCHEMA: &str = "audit_backup";

/// The schemas processed when no schema is named explicitly.
pub const DEFAULT_SCHEMAS: [&str; 2] = ["public", AUDIT_SCHEMA];

/// Schemas whose content is only ever written by triggers and the backup function.
const PROTECTED_SCHEMAS: [&str; 2] = [AUDIT_SCHEMA, AUDIT_BACKUP_SCHEMA];

/// Checks if write access requests are downgraded to read-only for `schema`.
pub fn is_protected_schema(schema: &str) -> bool {
    PROTECTED_SCHEMAS.contains(&schema)
}

/// The statements implementing `access` for `role` on `schema`.
///
/// Write access on a protected schema is downgraded to read-only.
pub fn grant_privileges_commands(role: &str, schema: &str, write: bool) -> Result<Vec<DdlStatement>> {
    let grant = PrivilegeGrant::new(role, schema, AccessLevel::from_write_flag(write));
    grant_commands(&grant)
}

fn grant_commands(grant: &PrivilegeGrant) -> Result<Vec<DdlStatement>> {
    let role = Identifier::role(&grant.role)?;
    let schema = Identifier::schema(&grant.schema)?;

    let mut commands = vec![
        grant_schema_usage(&schema, &role),
        grant_on_all_tables(TablePrivilege::Select, &schema, &role),
    ];

    if grant.access == AccessLevel::ReadWrite && !is_protected_schema(&grant.schema) {
        commands.push(grant_on_all_tables(TablePrivilege::Insert, &schema, &role));
        commands.push(grant_on_all_tables(TablePrivilege::Update, &schema, &role));
        commands.push(grant_on_all_tables(TablePrivilege::Delete, &schema, &role));
        commands.push(grant_on_all_sequences(SequencePrivilege::Usage, &schema, &role));
        commands.push(grant_on_all_sequences(SequencePrivilege::Update, &schema, &role));
    }

    Ok(commands)
}

/// Strips everything `role` holds on `schema`, usage last.
pub fn revoke_privileges_commands(role: &str, schema: &str) -> Result<Vec<DdlStatement>> {
    let role = Identifier::role(role)?;
    let schema = Identifier::schema(schema)?;

    Ok(vec![
        revoke_all_privileges(SchemaObjects::Tables, &schema, &role),
        revoke_all_privileges(SchemaObjects::Sequences, &schema, &role),
        revoke_all_privileges(SchemaObjects::Functions, &schema, &role),
        revoke_schema_usage(&schema, &role),
    ])
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PrivilegeAction {
    /// Only strip existing privileges.
    Revoke,
    /// Strip existing privileges, then grant the given level.
    Grant(AccessLevel),
}

/// Applies access policies for roles.
pub struct PrivilegeManager<'a> {
    connection: &'a PostgresClientWrapper,
    introspector: SchemaIntrospector<'a>,
}

impl<'a> PrivilegeManager<'a> {
    pub fn new(connection: &'a PostgresClientWrapper) -> Self {
        PrivilegeManager {
            connection,
            introspector: SchemaIntrospector::new(connection),
        }
    }

    /// Resets the privileges of `role` on `schema`, or on [`DEFAULT_SCHEMAS`] if no schema is given.
    ///
    /// A missing role or schema is reported in the outcome and logged, never raised. Privileges
    /// are always revoked before granting, so repeated runs don't accumulate anything.
    #[instrument(skip(self))]
    pub async fn grant_or_revoke(&self, role: &str, schema: Option<&str>, action: PrivilegeAction) -> Result<Vec<PrivilegeOutcome>> {
        if !self.introspector.role_exists(role).await? {
            warn!(role, "Role does not exist, no privileges changed");
            return Ok(vec![PrivilegeOutcome::RoleMissing]);
        }

        let schemas = match schema {
            Some(schema) => vec![schema],
            None => DEFAULT_SCHEMAS.to_vec(),
        };

        let mut outcomes = Vec::with_capacity(schemas.len());

        for schema in schemas {
            if !self.introspector.schema_exists(schema).await? {
                warn!(role, schema, "Schema does not exist, no privileges changed");
                outcomes.push(PrivilegeOutcome::SchemaMissing {
                    schema: schema.to_string(),
                });
                continue;
            }

            let mut commands = revoke_privileges_commands(role, schema)?;

            let outcome = match action {
                PrivilegeAction::Revoke => PrivilegeOutcome::Revoked {
                    schema: schema.to_string(),
                },
                PrivilegeAction::Grant(access) => {
                    commands.extend(grant_privileges_commands(role, schema, access == AccessLevel::ReadWrite)?);
                    let access = if is_protected_schema(schema) { AccessLevel::ReadOnly } else { access };
                    PrivilegeOutcome::Granted {
                        schema: schema.to_string(),
                        access,
                    }
                }
            };

            self.connection.execute_ddl_batch(&commands).await?;
            info!(role, schema, ?outcome, "Privileges updated");

            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}
