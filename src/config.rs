use anyhow::{Context, Result, bail};
use std::env;

pub const DEFAULT_PARTITION_KEY: &str = "TODO";
pub const DEFAULT_TABLE: &str = "todo";
/// Longest partition key the todo table can store, in characters.
pub const MAX_PARTITION_KEY_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
    pub table: String,
}

impl SpannerConfig {
    /// Full database path, e.g. `projects/p/instances/i/databases/d`
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    Memory,
    Spanner(SpannerConfig),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service_port: u16,
    pub service_host: String,
    pub storage: StorageConfig,
    pub partition_key: String,
    pub list_limit: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_port = lookup("SERVICE_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = lookup("SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("spanner") => StorageConfig::Spanner(spanner_from_lookup(&lookup)?),
            Some("memory") => StorageConfig::Memory,
            Some(other) => bail!("STORAGE_BACKEND must be 'spanner' or 'memory', got '{}'", other),
        };

        let partition_key =
            lookup("TODO_PARTITION_KEY").unwrap_or_else(|| DEFAULT_PARTITION_KEY.to_string());
        if partition_key.is_empty() {
            bail!("TODO_PARTITION_KEY must not be empty");
        }
        if partition_key.chars().count() > MAX_PARTITION_KEY_CHARS {
            bail!(
                "TODO_PARTITION_KEY must be at most {} characters, got {}",
                MAX_PARTITION_KEY_CHARS,
                partition_key.chars().count()
            );
        }

        let list_limit = match lookup("TODO_LIST_LIMIT") {
            Some(raw) => {
                let limit = raw
                    .parse::<usize>()
                    .context("TODO_LIST_LIMIT must be a positive integer")?;
                if limit == 0 {
                    bail!("TODO_LIST_LIMIT must be a positive integer");
                }
                Some(limit)
            }
            None => None,
        };

        Ok(Config {
            service_port,
            service_host,
            storage,
            partition_key,
            list_limit,
        })
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        match &self.storage {
            StorageConfig::Memory => tracing::info!("  Storage: in-memory"),
            StorageConfig::Spanner(spanner) => {
                tracing::info!(
                    "  Spanner emulator: {}",
                    spanner
                        .emulator_host
                        .as_deref()
                        .unwrap_or("disabled (using production)")
                );
                tracing::info!("  Spanner database: {}", spanner.database_path());
                tracing::info!("  Spanner table: {}", spanner.table);
            }
        }
        tracing::info!("  Partition key: {}", self.partition_key);
        match self.list_limit {
            Some(limit) => tracing::info!("  List limit: {}", limit),
            None => tracing::info!("  List limit: unbounded"),
        }
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

fn spanner_from_lookup<F>(lookup: &F) -> Result<SpannerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let emulator_host = lookup("SPANNER_EMULATOR_HOST");

    let table = lookup("TODO_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
    if table.is_empty()
        || table.starts_with(|c: char| c.is_ascii_digit())
        || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("TODO_TABLE must be a valid table identifier, got '{}'", table);
    }

    let (project, instance, database) = match lookup("SPANNER_DATABASE_PATH") {
        Some(path) => parse_database_path(&path)?,
        None => (
            lookup("SPANNER_PROJECT").context("SPANNER_PROJECT environment variable is required")?,
            lookup("SPANNER_INSTANCE")
                .context("SPANNER_INSTANCE environment variable is required")?,
            lookup("SPANNER_DATABASE")
                .context("SPANNER_DATABASE environment variable is required")?,
        ),
    };

    Ok(SpannerConfig {
        emulator_host,
        project,
        instance,
        database,
        table,
    })
}

fn parse_database_path(path: &str) -> Result<(String, String, String)> {
    match path.split('/').collect::<Vec<_>>().as_slice() {
        ["projects", project, "instances", instance, "databases", database]
            if !project.is_empty() && !instance.is_empty() && !database.is_empty() =>
        {
            Ok((project.to_string(), instance.to_string(), database.to_string()))
        }
        _ => bail!(
            "SPANNER_DATABASE_PATH must look like 'projects/P/instances/I/databases/D', got '{}'",
            path
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SPANNER_PROJECT", "test-project"),
        ("SPANNER_INSTANCE", "test-instance"),
        ("SPANNER_DATABASE", "test-database"),
    ];

    fn spanner(config: &Config) -> &SpannerConfig {
        match &config.storage {
            StorageConfig::Spanner(spanner) => spanner,
            StorageConfig::Memory => panic!("expected spanner storage"),
        }
    }

    #[test]
    fn test_config_with_all_vars() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("SPANNER_EMULATOR_HOST", "localhost:9010"),
            ("SERVICE_PORT", "8080"),
            ("SERVICE_HOST", "127.0.0.1"),
            ("TODO_TABLE", "todo_items"),
            ("TODO_PARTITION_KEY", "TENANT_A"),
            ("TODO_LIST_LIMIT", "500"),
        ]);

        let config = load(&vars).unwrap();
        let spanner = spanner(&config);

        assert_eq!(spanner.emulator_host, Some("localhost:9010".to_string()));
        assert_eq!(spanner.project, "test-project");
        assert_eq!(spanner.instance, "test-instance");
        assert_eq!(spanner.database, "test-database");
        assert_eq!(spanner.table, "todo_items");
        assert_eq!(config.service_port, 8080);
        assert_eq!(config.service_host, "127.0.0.1");
        assert_eq!(config.partition_key, "TENANT_A");
        assert_eq!(config.list_limit, Some(500));
    }

    #[test]
    fn test_config_with_defaults() {
        let config = load(&REQUIRED).unwrap();

        assert_eq!(spanner(&config).emulator_host, None);
        assert_eq!(spanner(&config).table, "todo");
        assert_eq!(config.service_port, 3000);
        assert_eq!(config.service_host, "0.0.0.0");
        assert_eq!(config.partition_key, "TODO");
        assert_eq!(config.list_limit, None);
    }

    #[test]
    fn test_database_path_connection_string() {
        let config = load(&[(
            "SPANNER_DATABASE_PATH",
            "projects/p1/instances/i1/databases/d1",
        )])
        .unwrap();

        assert_eq!(
            spanner(&config).database_path(),
            "projects/p1/instances/i1/databases/d1"
        );
    }

    #[test]
    fn test_malformed_database_path() {
        let result = load(&[("SPANNER_DATABASE_PATH", "projects/p1/databases/d1")]);
        assert!(result.unwrap_err().to_string().contains("SPANNER_DATABASE_PATH"));
    }

    #[test]
    fn test_missing_required_var() {
        let result = load(&REQUIRED[..2]);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("SPANNER_DATABASE"));
    }

    #[test]
    fn test_memory_backend_needs_no_spanner_vars() {
        let config = load(&[("STORAGE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_unknown_backend() {
        let result = load(&[("STORAGE_BACKEND", "azure")]);
        assert!(result.unwrap_err().to_string().contains("STORAGE_BACKEND"));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SERVICE_PORT", "not-a-number"));

        let result = load(&vars);
        assert!(result.unwrap_err().to_string().contains("SERVICE_PORT"));
    }

    #[test]
    fn test_port_out_of_range() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SERVICE_PORT", "99999"));

        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_invalid_table_name() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TODO_TABLE", "todo; DROP TABLE x"));

        let result = load(&vars);
        assert!(result.unwrap_err().to_string().contains("TODO_TABLE"));
    }

    #[test]
    fn test_empty_partition_key() {
        let result = load(&[("STORAGE_BACKEND", "memory"), ("TODO_PARTITION_KEY", "")]);
        assert!(result.unwrap_err().to_string().contains("TODO_PARTITION_KEY"));
    }

    #[test]
    fn test_partition_key_too_long() {
        let too_long = "K".repeat(MAX_PARTITION_KEY_CHARS + 1);
        let result = load(&[("STORAGE_BACKEND", "memory"), ("TODO_PARTITION_KEY", &too_long)]);
        assert!(result.unwrap_err().to_string().contains("TODO_PARTITION_KEY"));

        let longest = "é".repeat(MAX_PARTITION_KEY_CHARS);
        let config = load(&[("STORAGE_BACKEND", "memory"), ("TODO_PARTITION_KEY", &longest)]).unwrap();
        assert_eq!(config.partition_key, longest);
    }

    #[test]
    fn test_zero_list_limit() {
        let result = load(&[("STORAGE_BACKEND", "memory"), ("TODO_LIST_LIMIT", "0")]);
        assert!(result.unwrap_err().to_string().contains("TODO_LIST_LIMIT"));
    }
}
