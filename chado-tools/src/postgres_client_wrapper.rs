use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, Row, SimpleQueryMessage};
use tokio_postgres::types::{FromSqlOwned, ToSql};
use tracing::debug;
use crate::{ChadoToolsError, Result};
use crate::statements::DdlStatement;

/// Bind parameters for a query.
pub type Params<'a> = [&'a (dyn ToSql + Sync)];

/// The single connection every component of the engine works through.
///
/// Components borrow the wrapper, they never open or close connections themselves.
pub struct PostgresClientWrapper {
    client: Client,
    join_handle: JoinHandle<Result<()>>,
    version: i32,
}

impl PostgresClientWrapper {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let (client, connection) =
            tokio_postgres::connect(connection_string, NoTls).await?;

        // The connection object performs the actual communication with the database,
        // so spawn it off to run on its own.
        let join_handle = tokio::spawn(async move {
            match connection.await {
                Err(e) => Err(ChadoToolsError::PostgresError(e)),
                Ok(_) => Ok(())
            }
        });

        let messages = client.simple_query("SHOW server_version_num;").await?;
        // Newer clients report the row description before the rows.
        let first_row = messages.iter().find_map(|message| match message {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        });

        let version = match first_row {
            Some(row) => {
                let version: i32 = row
                    .get(0)
                    .and_then(|v| v.parse().ok())
                    .ok_or(ChadoToolsError::InvalidPostgresVersionResponse)?;
                if version < 120000 {
                    return Err(ChadoToolsError::UnsupportedPostgresVersion(version));
                }
                version / 1000
            }
            _ => return Err(ChadoToolsError::InvalidPostgresVersionResponse)
        };

        Ok(PostgresClientWrapper {
            client,
            join_handle,
            version
        })
    }

    pub async fn execute_non_query(&self, sql: &str) -> Result {
        self.client.batch_execute(sql).await.map_err(|e| ChadoToolsError::PostgresErrorWithQuery {
            source: e,
            query: sql.to_string(),
        })?;

        Ok(())
    }

    /// Executes a single generated DDL statement.
    pub async fn execute_ddl(&self, statement: &DdlStatement) -> Result {
        debug!(statement = statement.as_str(), "Executing ddl");
        self.client.batch_execute(statement.as_str()).await.map_err(|e| ChadoToolsError::DdlExecutionError {
            source: e,
            statement: statement.to_string(),
        })?;

        Ok(())
    }

    /// Executes the statements in order, as a single round trip.
    ///
    /// Nothing is executed when `statements` is empty.
    pub async fn execute_ddl_batch(&self, statements: &[DdlStatement]) -> Result {
        if statements.is_empty() {
            return Ok(());
        }

        let batch = statements.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(";\n");
        debug!(statements = statements.len(), "Executing ddl batch");

        self.client.batch_execute(&batch).await.map_err(|e| ChadoToolsError::DdlExecutionError {
            source: e,
            statement: batch,
        })?;

        Ok(())
    }

    pub async fn get_results<T: FromRow>(&self, sql: &str) -> Result<Vec<T>> {
        self.get_results_with_params(sql, &[]).await
    }

    /// Runs a catalog query with bind parameters.
    ///
    /// Failures are reported as [`ChadoToolsError::CatalogAccessError`].
    pub async fn get_results_with_params<T: FromRow>(&self, sql: &str, params: &Params<'_>) -> Result<Vec<T>> {
        let query_results = self.client.query(sql, params).await.map_err(|e| ChadoToolsError::CatalogAccessError {
            source: e,
            query: sql.to_string(),
        })?;

        let mut output = Vec::with_capacity(query_results.len());

        for row in query_results.into_iter() {
            output.push(T::from_row(row)?);
        }

        Ok(output)
    }

    /// Calls a function returning a single value.
    ///
    /// Errors raised while the function runs are reported as
    /// [`ChadoToolsError::PostgresErrorWithQuery`].
    pub async fn call_function<T: FromSqlOwned>(&self, sql: &str, params: &Params<'_>) -> Result<T> {
        let row = self.client.query_one(sql, params).await.map_err(|e| ChadoToolsError::PostgresErrorWithQuery {
            source: e,
            query: sql.to_string(),
        })?;

        Ok(row.try_get(0)?)
    }

    pub async fn get_result<T: FromRow>(&self, sql: &str) -> Result<T> {
        self.get_result_with_params(sql, &[]).await
    }

    pub async fn get_result_with_params<T: FromRow>(&self, sql: &str, params: &Params<'_>) -> Result<T> {
        let results = self.get_results_with_params(sql, params).await?;
        if results.len() != 1 {
            return Err(ChadoToolsError::InvalidNumberOfResults {
                actual: results.len(),
                expected: 1,
            });
        }

        results.into_iter().next().ok_or(ChadoToolsError::InvalidNumberOfResults {
            actual: 0,
            expected: 1,
        })
    }

    pub async fn get_single_results<T: FromSqlOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let r = self.get_results::<(T,)>(sql).await?.into_iter()
            .map(|t| t.0)
            .collect();

        Ok(r)
    }

    pub async fn get_single_result<T: FromSqlOwned>(&self, sql: &str) -> Result<T> {
        let result = self.get_result::<(T,)>(sql).await?;
        Ok(result.0)
    }

    pub async fn get_single_result_with_params<T: FromSqlOwned>(&self, sql: &str, params: &Params<'_>) -> Result<T> {
        let result = self.get_result_with_params::<(T,)>(sql, params).await?;
        Ok(result.0)
    }

    pub fn version(&self) -> i32 {
        self.version
    }
}

impl Drop for PostgresClientWrapper {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self>;
}

impl<T1: FromSqlOwned> FromRow for (T1,) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((
            row.try_get(0)?,
        ))
    }
}

impl<T1: FromSqlOwned, T2: FromSqlOwned> FromRow for (T1, T2) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((
            row.try_get(0)?,
            row.try_get(1)?,
        ))
    }
}

impl<T1: FromSqlOwned, T2: FromSqlOwned, T3: FromSqlOwned> FromRow for (T1, T2, T3) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((
            row.try_get(0)?,
            row.try_get(1)?,
            row.try_get(2)?,
        ))
    }
}
