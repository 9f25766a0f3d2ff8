//! Cloud Spanner todo store.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::mutation::insert;
use gcloud_spanner::row::Row;
use gcloud_spanner::statement::Statement;
use std::sync::Arc;

use super::{Result, StoreError, TodoStore};
use crate::config::SpannerConfig;
use crate::models::{ConcurrencyToken, TodoItem};

const COLUMNS: [&str; 6] = [
    "partition_key",
    "row_key",
    "created_time",
    "task_description",
    "is_completed",
    "version",
];

/// Todo store backed by a Spanner table keyed on (partition_key, row_key).
///
/// The concurrency token is the row's `version` column. Replace and delete
/// run as DML guarded by `version = @version`, so a stale token affects zero
/// rows and is reported as a conflict.
#[derive(Clone)]
pub struct SpannerTodoStore {
    inner: Arc<Client>,
    table: String,
}

impl SpannerTodoStore {
    /// Connect to Spanner, provisioning the instance, database and table first.
    ///
    /// The gcloud-spanner library picks up SPANNER_EMULATOR_HOST on its own
    /// and connects to the emulator when it is set.
    pub async fn from_config(config: &SpannerConfig) -> anyhow::Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
            table: config.table.clone(),
        })
    }

    fn select(&self, filter: &str) -> String {
        format!("SELECT {} FROM {} {}", COLUMNS.join(", "), self.table, filter)
    }

    async fn query_items(&self, statement: Statement) -> anyhow::Result<Vec<TodoItem>> {
        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query todos from Spanner")?;

        let mut items = Vec::new();
        while let Some(row) = result_set.next().await? {
            items.push(item_from_row(&row)?);
        }
        Ok(items)
    }

    /// Run a single DML statement in a read-write transaction, returning the
    /// number of rows it touched.
    async fn execute_dml(&self, statement: Statement) -> anyhow::Result<i64> {
        let result: std::result::Result<(_, i64), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let statement = statement.clone();
                Box::pin(async move { Ok(tx.update(statement).await?) })
            })
            .await;

        let (_, affected) = result.context("Failed to execute DML against Spanner")?;
        Ok(affected)
    }

    /// Version the write must match: the token's own, or for the wildcard the
    /// row's current one. A wildcard write on a missing row is a conflict.
    async fn expected_version(&self, item: &TodoItem, token: &ConcurrencyToken) -> Result<i64> {
        if let Some(version) = token.version() {
            return Ok(version);
        }
        if token.is_wildcard() {
            if let Some(current) = self.retrieve(&item.partition_key, &item.row_key).await? {
                if let Some(version) = current.etag.version() {
                    return Ok(version);
                }
            }
        }
        Err(conflict(item, token))
    }

    /// Perform a health check by executing a simple query
    async fn ping(&self) -> anyhow::Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self
            .inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

fn conflict(item: &TodoItem, token: &ConcurrencyToken) -> StoreError {
    StoreError::Conflict {
        row_key: item.row_key.clone(),
        token: token.to_string(),
    }
}

fn item_from_row(row: &Row) -> anyhow::Result<TodoItem> {
    // TIMESTAMP columns arrive RFC3339-encoded
    let created_time: String = row.column_by_name("created_time")?;
    let created_time = DateTime::parse_from_rfc3339(&created_time)
        .context("Failed to parse created_time timestamp")?
        .with_timezone(&Utc);
    let version: i64 = row.column_by_name("version")?;

    Ok(TodoItem {
        partition_key: row.column_by_name("partition_key")?,
        row_key: row.column_by_name("row_key")?,
        created_time,
        task_description: row.column_by_name("task_description")?,
        is_completed: row.column_by_name("is_completed")?,
        etag: ConcurrencyToken::from_version(version),
    })
}

#[async_trait]
impl TodoStore for SpannerTodoStore {
    async fn insert(&self, item: &TodoItem) -> Result<ConcurrencyToken> {
        let created_time = item
            .created_time
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let version: i64 = 1;

        let mutation = insert(
            &self.table,
            &COLUMNS,
            &[
                &item.partition_key,
                &item.row_key,
                &created_time,
                &item.task_description,
                &item.is_completed,
                &version,
            ],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {}
            Err(SpannerError::GRPC(status)) if status.code() == Code::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    row_key: item.row_key.clone(),
                });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context("Failed to insert todo into Spanner")
                    .into());
            }
        }

        tracing::debug!("Inserted todo with row key: {}", item.row_key);
        Ok(ConcurrencyToken::from_version(version))
    }

    async fn retrieve(&self, partition_key: &str, row_key: &str) -> Result<Option<TodoItem>> {
        let mut statement =
            Statement::new(self.select("WHERE partition_key = @partition_key AND row_key = @row_key"));
        statement.add_param("partition_key", &partition_key.to_string());
        statement.add_param("row_key", &row_key.to_string());

        let item = self.query_items(statement).await?.into_iter().next();
        tracing::debug!("Retrieved todo {} (found: {})", row_key, item.is_some());
        Ok(item)
    }

    async fn replace(&self, item: &TodoItem, token: &ConcurrencyToken) -> Result<ConcurrencyToken> {
        let expected = self.expected_version(item, token).await?;

        let mut statement = Statement::new(format!(
            "UPDATE {} SET task_description = @task_description, is_completed = @is_completed, \
             version = version + 1 \
             WHERE partition_key = @partition_key AND row_key = @row_key AND version = @version",
            self.table
        ));
        statement.add_param("task_description", &item.task_description);
        statement.add_param("is_completed", &item.is_completed);
        statement.add_param("partition_key", &item.partition_key);
        statement.add_param("row_key", &item.row_key);
        statement.add_param("version", &expected);

        if self.execute_dml(statement).await? == 0 {
            return Err(conflict(item, token));
        }

        tracing::debug!("Replaced todo {} at version {}", item.row_key, expected + 1);
        Ok(ConcurrencyToken::from_version(expected + 1))
    }

    async fn delete(&self, item: &TodoItem, token: &ConcurrencyToken) -> Result<()> {
        let expected = self.expected_version(item, token).await?;

        let mut statement = Statement::new(format!(
            "DELETE FROM {} \
             WHERE partition_key = @partition_key AND row_key = @row_key AND version = @version",
            self.table
        ));
        statement.add_param("partition_key", &item.partition_key);
        statement.add_param("row_key", &item.row_key);
        statement.add_param("version", &expected);

        if self.execute_dml(statement).await? == 0 {
            return Err(conflict(item, token));
        }

        tracing::debug!("Deleted todo {}", item.row_key);
        Ok(())
    }

    async fn scan_all(
        &self,
        partition_key: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TodoItem>> {
        let mut filter = match partition_key {
            Some(_) => "WHERE partition_key = @partition_key".to_string(),
            None => String::new(),
        };
        if let Some(limit) = limit {
            filter.push_str(&format!(" LIMIT {}", limit));
        }

        let mut statement = Statement::new(self.select(&filter));
        if let Some(partition_key) = partition_key {
            statement.add_param("partition_key", &partition_key.to_string());
        }

        let items = self.query_items(statement).await?;
        tracing::debug!(
            "Scanned {} todos (partition: {:?}, limit: {:?})",
            items.len(),
            partition_key,
            limit
        );
        Ok(items)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(self.ping().await?)
    }
}

/// Automatically provision Spanner instance, database, and table
///
/// Checks whether the configured resources exist and creates any that are
/// missing, so a fresh emulator needs no manual setup.
async fn auto_provision(config: &SpannerConfig) -> anyhow::Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, config, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path, &config.table).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> anyhow::Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

async fn ensure_database_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    instance_path: &str,
    database_path: &str,
) -> anyhow::Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", config.database),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

fn table_ddl(table: &str) -> String {
    format!(
        r#"
CREATE TABLE {table} (
    partition_key STRING(64) NOT NULL,
    row_key STRING(64) NOT NULL,
    created_time TIMESTAMP NOT NULL,
    task_description STRING(MAX) NOT NULL,
    is_completed BOOL NOT NULL,
    version INT64 NOT NULL,
) PRIMARY KEY (partition_key, row_key)
"#
    )
    .trim()
    .to_string()
}

async fn ensure_table_exists(
    admin_client: &AdminClient,
    database_path: &str,
    table: &str,
) -> anyhow::Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let plain = format!("CREATE TABLE {} ", table);
    let quoted = format!("CREATE TABLE `{}` ", table);
    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| stmt.contains(&plain) || stmt.contains(&quoted));

    if table_exists {
        tracing::info!("Table '{}' already exists", table);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating...", table);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![table_ddl(table)],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", table);
    Ok(())
}
