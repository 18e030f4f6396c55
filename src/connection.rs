use std::sync::Arc;

use derive_builder::Builder;

use crate::{
    SnowflakeError,
    auth::{AuthStrategy, session::Session},
    http::client::SnowflakeHttpClient,
};

#[derive(Builder, Debug, Clone)]
pub struct SnowflakeConnectionOpts {
    pub(crate) strategy: AuthStrategy,

    #[builder(setter(into))]
    pub(crate) account_id: String,

    #[builder(setter(into))]
    pub(crate) username: String,

    #[builder(setter(into, strip_option), default = None)]
    pub(crate) database: Option<String>,

    #[builder(setter(into, strip_option), default = None)]
    pub(crate) schema: Option<String>,

    #[builder(setter(into, strip_option), default = None)]
    pub(crate) role: Option<String>,

    #[builder(setter(into, strip_option), default = None)]
    pub(crate) warehouse: Option<String>,

    /// Override the Snowflake API endpoint used. Useful for region specific or private snowflake instances.
    ///
    /// If unset, this will default to `https://{account_id}.snowflakecomputing.com`
    #[builder(setter(into, strip_option), default = None)]
    pub(crate) host: Option<String>,
}

impl SnowflakeConnectionOpts {
    pub(crate) fn base_url(&self) -> String {
        match self.host.as_deref() {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.snowflakecomputing.com", self.account_id),
        }
    }

    /// Logs in over `client` and returns the authenticated session.
    pub async fn connect_with_client<C: SnowflakeHttpClient>(
        self,
        client: C,
    ) -> Result<Session<C>, SnowflakeError> {
        let connection = Connection {
            client,
            opts: Arc::new(self),
        };

        Session::new(connection).await
    }
}

#[derive(Clone)]
pub(crate) struct Connection<C>
where
    C: Clone,
{
    client: C,
    opts: Arc<SnowflakeConnectionOpts>,
}

impl<C> Connection<C>
where
    C: SnowflakeHttpClient,
{
    pub(crate) fn get_opts(&self) -> Arc<SnowflakeConnectionOpts> {
        self.opts.clone()
    }

    pub(crate) fn get_client(&self) -> C {
        self.client.clone()
    }
}
