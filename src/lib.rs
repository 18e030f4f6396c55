//! Runs files of `;` separated SQL statements against Snowflake, one statement at a time, on a
//! single session configured from `SNOWFLAKE_*` environment variables.

pub mod auth;
pub mod config;
pub(crate) mod connection;
pub(crate) mod driver;
pub(crate) mod errors;
pub mod factory;
pub(crate) mod http;
pub mod logging;
pub mod runner;
pub mod script;
pub mod warehouse;

pub(crate) use errors::{error, this_errors};

pub use auth::{AuthStrategy, session::Session};
pub use config::{ConfigError, DatabasePolicy, SnowflakeConfig};
pub use connection::{SnowflakeConnectionOpts, SnowflakeConnectionOptsBuilder};
pub use driver::{StatementKind, StatementOutcome};
pub use errors::SnowflakeError;
pub use factory::{SessionFactory, create_session};
pub use http::client::{SnowflakeHttpClient, default_client};
pub use runner::{RunError, RunPhase, RunSummary, ScriptRunner};
pub use script::{Statement, split_statements};
pub use warehouse::{SnowflakeWarehouse, Warehouse, WarehouseSession};
