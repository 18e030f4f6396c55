use crate::{
    RunError, SnowflakeError,
    auth::session::Session,
    config::{DatabasePolicy, SnowflakeConfig},
    warehouse::{SnowflakeWarehouse, Warehouse},
};

/// Opens sessions against a warehouse with one fixed configuration.
///
/// Every call to [`SessionFactory::create_session`] logs in again; nothing is pooled.
pub struct SessionFactory<W: Warehouse> {
    warehouse: W,
    config: SnowflakeConfig,
}

impl<W: Warehouse> SessionFactory<W> {
    pub fn new(warehouse: W, config: SnowflakeConfig) -> Self {
        Self { warehouse, config }
    }

    /// Resolves the configuration through `lookup` before anything can connect.
    pub fn from_lookup(
        warehouse: W,
        policy: &DatabasePolicy,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RunError> {
        let config = SnowflakeConfig::from_lookup(policy, lookup)?;

        Ok(Self::new(warehouse, config))
    }

    pub async fn create_session(&self) -> Result<W::Session, SnowflakeError> {
        tracing::info!(
            account = %self.config.account,
            user = %self.config.user,
            role = %self.config.role,
            warehouse = %self.config.warehouse,
            database = %self.config.database,
            "connecting to snowflake"
        );

        self.warehouse.connect(&self.config).await
    }
}

impl SessionFactory<SnowflakeWarehouse<reqwest::Client>> {
    /// Resolves the configuration from the environment. Fails before any network access when a
    /// required variable is missing.
    pub fn from_env(policy: &DatabasePolicy) -> Result<Self, RunError> {
        let warehouse = SnowflakeWarehouse::new().map_err(RunError::Connect)?;

        Self::from_lookup(warehouse, policy, |key| std::env::var(key).ok())
    }
}

/// Opens a Snowflake session configured entirely from the environment.
///
/// `SNOWFLAKE_DATABASE` is required here, unlike the script runner which falls back to
/// [`DEFAULT_DATABASE`](crate::config::DEFAULT_DATABASE).
pub async fn create_session() -> Result<Session<reqwest::Client>, RunError> {
    let factory = SessionFactory::from_env(&DatabasePolicy::Required)?;
    factory.create_session().await.map_err(RunError::Connect)
}
