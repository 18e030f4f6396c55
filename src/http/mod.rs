use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{error, http::client::SnowflakeHttpClient, this_errors};
use derive_builder::Builder;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{SnowflakeError, connection::Connection};

pub mod client;
pub(crate) mod close;
pub(crate) mod login;
mod macros;
pub(crate) mod renew;
mod url;

pub(crate) use macros::params;

/// Envelope every Snowflake REST response is wrapped in.
#[derive(Deserialize, Debug)]
pub(crate) struct GenericResponse<T> {
    pub(crate) data: Option<T>,
    pub(crate) code: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) success: bool,
}

impl<T> GenericResponse<T> {
    /// Unwraps `data` from a successful response, or turns the failure into a [`SnowflakeError`].
    pub(crate) fn into_data(self) -> Result<T, SnowflakeError> {
        if !self.success {
            return Err(SnowflakeError::server(
                "GenericResponse::into_data",
                self.message
                    .unwrap_or_else(|| "request failed without a message".to_string()),
                self.code,
                None,
            ));
        }

        self.data.ok_or(error!("missing data in successful response"))
    }
}

#[derive(Builder)]
pub(crate) struct Request<C: SnowflakeHttpClient> {
    connection: Connection<C>,

    #[builder(setter(into, strip_option), default = None)]
    params: Option<Vec<(String, String)>>,

    #[builder(setter(into), default = HashMap::new())]
    headers: HashMap<String, String>,

    #[builder(default = None, setter(into, strip_option))]
    path: Option<String>,

    #[builder(setter(into, strip_option), default = None)]
    auth_token: Option<String>,
}

impl<C: SnowflakeHttpClient> Request<C> {
    fn build_url(&self) -> Result<String, SnowflakeError> {
        let path = self
            .path
            .as_deref()
            .ok_or(error!("path needs to be set on Request"))?;

        // Result URLs handed back by the API are already absolute
        let base = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.connection.get_opts().base_url(), path)
        };

        let client_start_time = this_errors!(
            "system clock is before the unix epoch",
            SystemTime::now().duration_since(UNIX_EPOCH)
        );

        let mut params = params!(
            ("requestId", uuid::Uuid::new_v4().to_string()),
            ("request_guid", uuid::Uuid::new_v4().to_string()),
            ("clientStartTime", client_start_time.as_secs().to_string())
        );

        if let Some(p) = self.params.as_deref() {
            params.extend_from_slice(p);
        }

        let url = this_errors!(
            "failed to construct url",
            url::construct_url(base.as_str(), &params)
        );

        Ok(url)
    }

    fn finish_headers(&mut self) -> HashMap<String, String> {
        let mut headers = std::mem::take(&mut self.headers);

        if let Some(token) = self.auth_token.take() {
            headers.insert(
                "Authorization".into(),
                format!("Snowflake Token=\"{}\"", &token),
            );
        }

        headers
    }

    pub async fn post<T: DeserializeOwned>(
        mut self,
        body: serde_json::Value,
    ) -> Result<T, SnowflakeError> {
        let url = self.build_url()?;
        let mut headers = self.finish_headers();

        headers.insert("content-type".into(), "application/json".into());

        let body_bytes = this_errors!(
            "failed to serialise body as json",
            serde_json::to_vec(&body)
        );

        let resp = self
            .connection
            .get_client()
            .post(url.as_str(), body_bytes, headers)
            .await?;

        tracing::trace!(bytes = resp.len(), "snowflake response");

        let resp_as_json = this_errors!(
            "failed to parse response as json",
            serde_json::from_slice::<T>(&resp)
        );

        Ok(resp_as_json)
    }

    pub async fn get<T: DeserializeOwned>(mut self) -> Result<T, SnowflakeError> {
        let url = self.build_url()?;
        let headers = self.finish_headers();

        let resp = self
            .connection
            .get_client()
            .get(url.as_str(), headers)
            .await?;

        tracing::trace!(bytes = resp.len(), "snowflake response");

        let resp_as_json = this_errors!(
            "failed to parse response as json",
            serde_json::from_slice::<T>(&resp)
        );

        Ok(resp_as_json)
    }
}
