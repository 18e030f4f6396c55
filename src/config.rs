use std::fmt::Debug;

use crate::{
    SnowflakeConnectionOpts, SnowflakeConnectionOptsBuilder, SnowflakeError, auth::AuthStrategy,
    this_errors,
};

pub const ACCOUNT_VAR: &str = "SNOWFLAKE_ACCOUNT";
pub const USER_VAR: &str = "SNOWFLAKE_USER";
pub const PASSWORD_VAR: &str = "SNOWFLAKE_PASSWORD";
pub const ROLE_VAR: &str = "SNOWFLAKE_ROLE";
pub const WAREHOUSE_VAR: &str = "SNOWFLAKE_WAREHOUSE";
pub const DATABASE_VAR: &str = "SNOWFLAKE_DATABASE";
pub const SCHEMA_VAR: &str = "SNOWFLAKE_SCHEMA";
pub const HOST_VAR: &str = "SNOWFLAKE_HOST";

/// Database used by the script runner when `SNOWFLAKE_DATABASE` is not set.
pub const DEFAULT_DATABASE: &str = "SNOWPARK_DB";

/// How a missing `SNOWFLAKE_DATABASE` is treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabasePolicy {
    /// The variable must be set.
    Required,
    /// Use the given database when the variable is not set.
    Fallback(String),
}

impl Default for DatabasePolicy {
    fn default() -> Self {
        DatabasePolicy::Fallback(DEFAULT_DATABASE.to_string())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

/// Connection parameters resolved once at startup and handed to whoever opens sessions.
#[derive(Clone, PartialEq, Eq)]
pub struct SnowflakeConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: String,
    pub warehouse: String,
    pub database: String,
    pub schema: Option<String>,
    pub host: Option<String>,
}

impl Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"****")
            .field("role", &self.role)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("host", &self.host)
            .finish()
    }
}

impl SnowflakeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env(policy: &DatabasePolicy) -> Result<Self, ConfigError> {
        Self::from_lookup(policy, |key| std::env::var(key).ok())
    }

    /// Resolves the configuration through `lookup`. Blank values count as missing, and every
    /// missing variable is reported at once. Values are kept exactly as given.
    pub fn from_lookup(
        policy: &DatabasePolicy,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();

        let mut required = |key: &'static str| match non_blank(lookup(key)) {
            Some(value) => value,
            None => {
                missing.push(key);
                String::new()
            }
        };

        let account = required(ACCOUNT_VAR);
        let user = required(USER_VAR);
        let password = required(PASSWORD_VAR);
        let role = required(ROLE_VAR);
        let warehouse = required(WAREHOUSE_VAR);
        let database = match policy {
            DatabasePolicy::Required => required(DATABASE_VAR),
            DatabasePolicy::Fallback(default) => {
                non_blank(lookup(DATABASE_VAR)).unwrap_or_else(|| default.clone())
            }
        };

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            account,
            user,
            password,
            role,
            warehouse,
            database,
            schema: non_blank(lookup(SCHEMA_VAR)),
            host: non_blank(lookup(HOST_VAR)),
        })
    }

    pub fn connection_opts(&self) -> Result<SnowflakeConnectionOpts, SnowflakeError> {
        let mut builder = SnowflakeConnectionOptsBuilder::default();
        builder
            .strategy(AuthStrategy::Password(self.password.clone()))
            .account_id(self.account.as_str())
            .username(self.user.as_str())
            .role(self.role.as_str())
            .warehouse(self.warehouse.as_str())
            .database(self.database.as_str());

        if let Some(schema) = &self.schema {
            builder.schema(schema.as_str());
        }

        if let Some(host) = &self.host {
            builder.host(host.as_str());
        }

        Ok(this_errors!("failed to build connection options", builder.build()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
