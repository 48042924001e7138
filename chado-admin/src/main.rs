use crate::cli::{Cli, Commands, DbArgs, GrantArgs, RoleArgs};
use chado_tools::{
    AccessLevel, AuditSchemaBuilder, BackupFunctionManager, ChadoToolsError, IdentifierQuoter,
    PostgresClientWrapper, PrivilegeAction, PrivilegeManager, PrivilegeOutcome, SchemaIntrospector,
};
use clap::Parser;
use thiserror::Error;
use tracing::instrument;

mod cli;

#[derive(Error, Debug)]
enum AdminError {
    #[error(transparent)]
    ChadoTools(#[from] ChadoToolsError),

    #[error("Failed to serialize output: `{0}`")]
    Serialization(#[from] serde_json::Error),
}

type Result<T = ()> = std::result::Result<T, AdminError>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let output = run(cli).await?;
    println!("{output}");

    Ok(())
}

#[instrument(skip_all)]
async fn run(cli: Cli) -> Result<String> {
    let connection = PostgresClientWrapper::new(&cli.db_args.get_connection_string()).await?;

    let output = match cli.command {
        Commands::Inspect { schema } => do_inspect(&connection, &schema).await?,
        Commands::SetupAudit { source_schema, with_backup } => {
            do_setup_audit(&connection, &source_schema, with_backup).await?
        }
        Commands::Grant(GrantArgs { role, write }) => {
            let action = PrivilegeAction::Grant(AccessLevel::from_write_flag(write));
            do_privileges(&connection, role, action).await?
        }
        Commands::Revoke(role) => do_privileges(&connection, role, PrivilegeAction::Revoke).await?,
        Commands::BackupAudit { date } => do_backup(&connection, &date).await?,
    };

    Ok(output)
}

#[instrument(skip(connection))]
async fn do_inspect(connection: &PostgresClientWrapper, schema: &str) -> Result<String> {
    let tables = SchemaIntrospector::new(connection).get_table_descriptors(schema).await?;

    Ok(serde_json::to_string_pretty(&tables)?)
}

#[instrument(skip(connection))]
async fn do_setup_audit(connection: &PostgresClientWrapper, source_schema: &str, with_backup: bool) -> Result<String> {
    let quoter = IdentifierQuoter::load(connection).await?;
    let tables = SchemaIntrospector::new(connection).get_table_descriptors(source_schema).await?;

    let audit_tables = AuditSchemaBuilder::new(connection, &quoter).create(&tables).await?;

    if with_backup {
        BackupFunctionManager::new(connection, &quoter).create(&audit_tables).await?;
    }

    Ok(format!("Audit schema covers {} tables of '{}'", audit_tables.len(), source_schema))
}

#[instrument(skip(connection))]
async fn do_privileges(connection: &PostgresClientWrapper, args: RoleArgs, action: PrivilegeAction) -> Result<String> {
    let outcomes = PrivilegeManager::new(connection)
        .grant_or_revoke(&args.role, args.schema.as_deref(), action)
        .await?;

    let lines: Vec<String> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            PrivilegeOutcome::Granted { schema, access } => format!("Granted {access} access on '{schema}' to '{}'", args.role),
            PrivilegeOutcome::Revoked { schema } => format!("Revoked all privileges on '{schema}' from '{}'", args.role),
            PrivilegeOutcome::RoleMissing => format!("Role '{}' does not exist, nothing changed", args.role),
            PrivilegeOutcome::SchemaMissing { schema } => format!("Schema '{schema}' does not exist, skipped"),
        })
        .collect();

    Ok(lines.join("\n"))
}

#[instrument(skip(connection))]
async fn do_backup(connection: &PostgresClientWrapper, date: &str) -> Result<String> {
    let quoter = IdentifierQuoter::load(connection).await?;

    let output = match BackupFunctionManager::new(connection, &quoter).execute_backup_function(date).await? {
        Some(moved) => moved.to_string(),
        None => "The backup function does not exist. Run setup-audit with --with-backup first".to_string(),
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chado_test_macros::pg_test;
    use chado_tools::test_helpers;
    use chado_tools::test_helpers::TestHelper;

    fn cli(helper: &TestHelper, command: Commands) -> Cli {
        Cli {
            db_args: DbArgs::from_test_helper(helper),
            command,
        }
    }

    #[pg_test(arg(postgres = 16))]
    async fn sets_up_audit_and_grants_access(helper: &TestHelper) {
        helper.execute_not_query(r#"
        create table organism(organism_id bigserial primary key, genus text not null, species text not null);
        create table feature(feature_id bigserial primary key, organism_id bigint references organism(organism_id), name text);
        "#).await;
        let role = helper.create_role("curator").await;

        let output = run(cli(helper, Commands::SetupAudit { source_schema: "public".to_string(), with_backup: true })).await.unwrap();
        assert_eq!(output, "Audit schema covers 2 tables of 'public'");

        // Rerunning is fine.
        run(cli(helper, Commands::SetupAudit { source_schema: "public".to_string(), with_backup: true })).await.unwrap();

        let output = run(cli(helper, Commands::Grant(GrantArgs {
            role: RoleArgs { role: role.clone(), schema: None },
            write: true,
        }))).await.unwrap();
        assert_eq!(output, format!("Granted read-write access on 'public' to '{role}'\nGranted read-only access on 'audit' to '{role}'"));

        helper.execute_not_query("insert into organism(genus, species) values ('Plasmodium', 'falciparum');").await;
        let output = run(cli(helper, Commands::BackupAudit { date: "29991231".to_string() })).await.unwrap();
        assert_eq!(output, "1");

        let output = run(cli(helper, Commands::Revoke(RoleArgs { role: role.clone(), schema: Some("public".to_string()) }))).await.unwrap();
        assert_eq!(output, format!("Revoked all privileges on 'public' from '{role}'"));
    }

    #[pg_test(arg(postgres = 16))]
    async fn inspects_tables_as_json(helper: &TestHelper) {
        helper.execute_not_query("create table cvterm(cvterm_id bigserial primary key, name text not null);").await;

        let output = run(cli(helper, Commands::Inspect { schema: "public".to_string() })).await.unwrap();
        let tables: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(tables[0]["name"], "cvterm");
        assert_eq!(tables[0]["primary_key"][0], "cvterm_id");
        assert_eq!(tables[0]["columns"][1]["name"], "name");
        assert_eq!(tables[0]["columns"][1]["is_nullable"], false);
    }

    #[pg_test(arg(postgres = 16))]
    async fn backup_without_setup_is_reported(helper: &TestHelper) {
        let output = run(cli(helper, Commands::BackupAudit { date: "20230101".to_string() })).await.unwrap();

        assert_eq!(output, "The backup function does not exist. Run setup-audit with --with-backup first");
    }
}
