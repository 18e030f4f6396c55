//! The capabilities the runner needs from a warehouse: connect, execute, close.
//!
//! [`SnowflakeWarehouse`] is the real implementation. Anything else implementing these traits
//! can stand in for it, which is how the splitting and sequencing logic is tested offline.

use std::future::Future;

use crate::{
    SnowflakeError,
    auth::session::Session,
    config::SnowflakeConfig,
    driver::StatementOutcome,
    http::client::{self, SnowflakeHttpClient},
};

pub trait WarehouseSession {
    /// Runs one statement to completion, discarding any result rows.
    fn execute(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<StatementOutcome, SnowflakeError>>;

    /// Releases the session.
    fn close(self) -> impl Future<Output = Result<(), SnowflakeError>>;
}

pub trait Warehouse {
    type Session: WarehouseSession;

    /// Opens a new authenticated session. Sessions are never cached or reused.
    fn connect(
        &self,
        config: &SnowflakeConfig,
    ) -> impl Future<Output = Result<Self::Session, SnowflakeError>>;
}

/// Snowflake reached over its REST API.
#[derive(Clone)]
pub struct SnowflakeWarehouse<C: SnowflakeHttpClient> {
    client: C,
}

impl SnowflakeWarehouse<reqwest::Client> {
    pub fn new() -> Result<Self, SnowflakeError> {
        Ok(Self {
            client: client::default_client()?,
        })
    }
}

impl<C: SnowflakeHttpClient> SnowflakeWarehouse<C> {
    pub fn with_client(client: C) -> Self {
        Self { client }
    }
}

impl<C: SnowflakeHttpClient> Warehouse for SnowflakeWarehouse<C> {
    type Session = Session<C>;

    async fn connect(&self, config: &SnowflakeConfig) -> Result<Session<C>, SnowflakeError> {
        config
            .connection_opts()?
            .connect_with_client(self.client.clone())
            .await
    }
}

impl<C: SnowflakeHttpClient> WarehouseSession for Session<C> {
    async fn execute(&mut self, sql: &str) -> Result<StatementOutcome, SnowflakeError> {
        Session::execute(self, sql).await
    }

    async fn close(self) -> Result<(), SnowflakeError> {
        Session::close(self).await
    }
}
