use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about)]
#[command(propagate_version = true)]
/// Sets up audit schemas and manages role privileges for CHADO databases.
///
/// Every command can be rerun safely: existing objects are detected and left alone.
pub struct Cli {
    #[command(flatten)]
    pub db_args: DbArgs,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the tables of a schema, with columns, primary keys and parents, as JSON
    Inspect {
        #[arg(long, default_value = "public")]
        schema: String,
    },
    /// Create or complete the audit schema for every table of the source schema
    SetupAudit {
        /// The schema holding the tables to audit
        #[arg(long, default_value = "public")]
        source_schema: String,

        /// Also set up the backup schema and the function archiving old audit rows
        #[arg(long)]
        with_backup: bool,
    },
    /// Reset the privileges of a role, then grant read-only or read-write access
    Grant(GrantArgs),
    /// Revoke every privilege a role holds
    Revoke(RoleArgs),
    /// Move audit rows older than a date into the backup schema
    BackupAudit {
        /// The cutoff date, e.g. 20230101. Rows captured before this date are archived.
        #[arg(long)]
        date: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RoleArgs {
    /// The role to change privileges for
    #[arg(long)]
    pub role: String,

    /// The schema to change privileges on. If not specified, both `public` and `audit` are changed.
    #[arg(long)]
    pub schema: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct GrantArgs {
    #[command(flatten)]
    pub role: RoleArgs,

    /// Grant write access as well. Audit schemas are always read-only.
    #[arg(long)]
    pub write: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    /// The host of the database
    #[arg(long, env = "CHADO_HOST", default_value = "localhost")]
    pub db_host: String,

    /// The port of the database
    #[arg(long, env = "CHADO_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// The username to use when connecting to the database
    #[arg(long, env = "CHADO_USER")]
    pub db_user: String,

    /// The password to use when connecting to the database
    #[arg(long, env = "CHADO_PASS", hide_env_values = true)]
    pub db_password: String,

    /// The name of the database
    #[arg(long, env = "CHADO_DATABASE")]
    pub db_name: String,
}

impl DbArgs {
    pub(crate) fn get_connection_string(&self) -> String {
        format!("host={} port={} user={} password={} dbname={}", self.db_host, self.db_port, self.db_user, self.db_password, self.db_name)
    }

    #[cfg(test)]
    pub(crate) fn from_test_helper(helper: &chado_tools::test_helpers::TestHelper) -> Self {
        Self {
            db_host: "localhost".to_string(),
            db_port: helper.port,
            db_user: "postgres".to_string(),
            db_password: "passw0rd".to_string(),
            db_name: helper.test_db_name.clone(),
        }
    }
}
