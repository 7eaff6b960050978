use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::config::DatabaseConfig;
use crate::db::{DatabaseClient, EngineKind, MySqlClient, PostgresClient, SqliteClient};

/// All configured databases, connected once at startup.
///
/// The registry is immutable after construction. Handlers share it behind
/// an `Arc` and never need a lock; changing the set of databases means
/// restarting the process.
pub struct DatabaseRegistry {
    clients: HashMap<String, Arc<dyn DatabaseClient>>,
    names: Vec<String>,
}

impl DatabaseRegistry {
    /// Connect every configured database. Any failure aborts startup;
    /// a gateway that silently dropped a backend would be worse than one
    /// that refuses to boot.
    pub async fn connect(configs: &[DatabaseConfig]) -> Result<Self> {
        let mut clients = Vec::with_capacity(configs.len());
        for config in configs {
            let client: Arc<dyn DatabaseClient> = match config.engine {
                EngineKind::Postgres => Arc::new(
                    PostgresClient::connect(config)
                        .await
                        .with_context(|| format!("database '{}' failed to connect", config.name))?,
                ),
                EngineKind::MySql => Arc::new(
                    MySqlClient::connect(config)
                        .await
                        .with_context(|| format!("database '{}' failed to connect", config.name))?,
                ),
                EngineKind::Sqlite => Arc::new(
                    SqliteClient::connect(config)
                        .await
                        .with_context(|| format!("database '{}' failed to connect", config.name))?,
                ),
            };
            log::info!("connected database '{}' ({})", config.name, config.engine);
            clients.push((config.name.clone(), client));
        }
        Self::from_clients(clients)
    }

    /// Build a registry from already-connected clients. Lookup keys fold to
    /// lowercase; names keep their configured spelling and order.
    pub fn from_clients(pairs: Vec<(String, Arc<dyn DatabaseClient>)>) -> Result<Self> {
        let mut clients = HashMap::with_capacity(pairs.len());
        let mut names = Vec::with_capacity(pairs.len());
        for (name, client) in pairs {
            if clients.insert(name.to_lowercase(), client).is_some() {
                bail!("duplicate database name '{name}' in configuration");
            }
            names.push(name);
        }
        Ok(Self { clients, names })
    }

    /// Case-insensitive lookup of one configured database.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseClient>> {
        self.clients.get(&name.to_lowercase()).cloned()
    }

    /// Configured names, in configuration order and original spelling.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
