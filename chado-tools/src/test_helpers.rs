use std::panic::{RefUnwindSafe, UnwindSafe};
use std::sync::Mutex;
use tokio_postgres::types::FromSqlOwned;
use uuid::Uuid;
use crate::postgres_client_wrapper::{FromRow, PostgresClientWrapper};
use crate::quoting::IdentifierQuoter;

/// A helper for running tests that require a database.
///
/// This will automatically create a new database for each test,
/// and drop it when the test is done, if the test succeeded.
///
/// All the methods on this struct unwraps errors directly to make it easier to write tests.
pub struct TestHelper {
    /// The name of the test database
    pub test_db_name: String,
    /// The main connected used against the database
    main_connection: PostgresClientWrapper,
    /// An identifier for the test helper
    helper_name: String,
    /// The port of the Postgres instance that was connected to.
    pub port: u16,
    /// Roles created through the helper, dropped again during cleanup since roles are cluster wide.
    created_roles: Mutex<Vec<String>>,
    /// If the database was cleaned up nicely
    cleaned_up_nicely: bool,
}

impl Drop for TestHelper {
    /// Drops the test helper, cleaning up the database if the test succeeded.
    fn drop(&mut self) {
        if self.cleaned_up_nicely {
            return;
        }

        if std::thread::panicking() {
            eprintln!("Thread is panicking when dropping test helper. Leaving database '{}' ({}) around to be inspected", self.test_db_name, self.helper_name);
        } else {
            let db_name = self.test_db_name.clone();
            let roles = self.created_roles.lock().map(|r| r.clone()).unwrap_or_default();
            let port = self.port;
            std::thread::spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                runtime.block_on(cleanup(&db_name, &roles, port));
            })
                .join()
                .expect("Failed to run test helper cleanup from drop");
        }
    }
}

impl RefUnwindSafe for TestHelper {}

impl UnwindSafe for TestHelper {}

/// Creates a new test helper, using a random database name.
/// This will connect to Postgres 16 on port 5416.
pub async fn get_test_helper(name: &str) -> TestHelper {
    get_test_helper_on_port(name, 5416).await
}

/// Creates a new test helper, using a random database name and a specific port.
pub async fn get_test_helper_on_port(name: &str, port: u16) -> TestHelper {
    let id = Uuid::new_v4().simple().to_string();

    let test_db_name = format!("chado_test_{}", id);
    {
        let conn = get_test_connection_on_port("postgres", port).await;

        conn.execute_non_query(&format!("create database {}", test_db_name)).await.expect("Failed to create test database");
    }

    let conn = get_test_connection_on_port(&test_db_name, port).await;

    TestHelper {
        test_db_name,
        main_connection: conn,
        helper_name: name.to_string(),
        port,
        created_roles: Mutex::new(Vec::new()),
        cleaned_up_nicely: false,
    }
}

impl TestHelper {
    /// Executes a query that does not return any results.
    pub async fn execute_not_query(&self, sql: &str) {
        self.get_conn().execute_non_query(sql).await.unwrap_or_else(|e| panic!("Failed to execute non query: {:?}\n{}", e, sql));
    }

    /// Executes a query that returns results.
    pub async fn get_results<T: FromRow>(&self, sql: &str) -> Vec<T> {
        self.get_conn().get_results(sql).await.unwrap_or_else(|e| panic!("Failed to get results for query: {:?}\n{}", e, sql))
    }

    /// Executes a query that returns a single column.
    pub async fn get_single_results<T: FromSqlOwned>(&self, sql: &str) -> Vec<T> {
        self.get_results::<(T, )>(sql).await.into_iter()
            .map(|t| t.0)
            .collect()
    }

    /// Executes a query that returns a single column of a single row result.
    pub async fn get_single_result<T: FromSqlOwned>(&self, sql: &str) -> T {
        let results = self.get_single_results::<T>(sql).await;
        assert_eq!(results.len(), 1, "Expected one result, got {}", results.len());
        results.into_iter().next().unwrap()
    }

    /// Gets the underlying connection to the database.
    pub fn get_conn(&self) -> &PostgresClientWrapper {
        &self.main_connection
    }

    /// Loads the identifier quoter of the test server.
    pub async fn get_quoter(&self) -> IdentifierQuoter {
        IdentifierQuoter::load(self.get_conn()).await.expect("Failed to load keywords")
    }

    /// Opens a second, independent connection to the test database.
    pub async fn open_connection(&self) -> PostgresClientWrapper {
        get_test_connection_on_port(&self.test_db_name, self.port).await
    }

    /// Creates a role that is unique to this test. Returns the role name.
    pub async fn create_role(&self, prefix: &str) -> String {
        let role = format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12]);
        self.execute_not_query(&format!("create role {}", role)).await;
        self.created_roles.lock().unwrap().push(role.clone());
        role
    }

    /// Stops the test helper, cleaning up the database.
    pub async fn stop(mut self) {
        let roles = self.created_roles.lock().unwrap().clone();
        cleanup(&self.test_db_name, &roles, self.port).await;
        self.cleaned_up_nicely = true;
    }
}

/// Gets a connection to the specified database on the specified port.
async fn get_test_connection_on_port(database_name: &str, port: u16) -> PostgresClientWrapper {
    let connection_string = format!("host=localhost port={port} user=postgres password=passw0rd dbname={database_name}");

    PostgresClientWrapper::new(&connection_string).await.expect("Connection to test database failed. Is postgres running?")
}

async fn cleanup(db_name: &str, roles: &[String], port: u16) {
    let conn = get_test_connection_on_port("postgres", port).await;
    conn.execute_non_query(&format!("drop database {} with (force);", db_name)).await.expect("Failed to drop test database");

    for role in roles {
        conn.execute_non_query(&format!("drop role if exists {};", role)).await.expect("Failed to drop test role");
    }
}
