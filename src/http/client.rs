use std::collections::HashMap;

use crate::SnowflakeError;
use core::future::Future;

/// Transport used to talk to the Snowflake REST API.
///
/// Implemented for [`reqwest::Client`]. Anything that can move bytes over HTTP can be plugged in,
/// which is how the session is exercised without a live account.
pub trait SnowflakeHttpClient: Clone + Send + Sync + 'static {
    fn get(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send;

    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send;
}

/// Builds the [`reqwest::Client`] used when no other transport is supplied.
pub fn default_client() -> Result<reqwest::Client, SnowflakeError> {
    use crate::this_errors;

    let client = this_errors!(
        "failed to build http client",
        reqwest::Client::builder().gzip(true).referer(false).build()
    );

    Ok(client)
}

fn to_header_map(headers: HashMap<String, String>) -> Result<reqwest::header::HeaderMap, SnowflakeError> {
    use crate::error;

    headers
        .iter()
        .map(|(k, v)| {
            Ok((
                reqwest::header::HeaderName::from_bytes(k.as_bytes()).map_err(|e| error!(e))?,
                reqwest::header::HeaderValue::from_str(v.as_str()).map_err(|e| error!(e))?,
            ))
        })
        .collect::<Result<reqwest::header::HeaderMap, SnowflakeError>>()
}

async fn read_body(resp: reqwest::Response) -> Result<Vec<u8>, SnowflakeError> {
    use crate::{error, this_errors};

    let status = resp.status();
    let bytes = this_errors!("failed to get response bytes", resp.bytes().await);

    // Snowflake reports most failures as JSON with a 200. Anything else is a transport problem.
    if !status.is_success() {
        return Err(error!(format!(
            "unexpected http status {}: {}",
            status,
            String::from_utf8_lossy(&bytes)
        )));
    }

    Ok(bytes.to_vec())
}

impl SnowflakeHttpClient for reqwest::Client {
    fn get(
        &self,
        url: &str,
        headers: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send {
        use crate::this_errors;

        let url = url.to_string();

        async move {
            let url = this_errors!("failed to parse url", reqwest::Url::parse(&url));
            let headers = to_header_map(headers)?;

            tracing::trace!(%url, "GET");

            let resp = this_errors!(
                "failed to send get request",
                self.get(url).headers(headers).send().await
            );

            read_body(resp).await
        }
    }

    fn post(
        &self,
        url: &str,
        body: Vec<u8>,
        headers: HashMap<String, String>,
    ) -> impl Future<Output = Result<Vec<u8>, SnowflakeError>> + Send {
        use crate::this_errors;

        let url = url.to_string();

        async move {
            let url = this_errors!("failed to parse url", reqwest::Url::parse(&url));
            let headers = to_header_map(headers)?;

            tracing::trace!(%url, bytes = body.len(), "POST");

            let resp = this_errors!(
                "failed to send post request",
                self.post(url).body(body).headers(headers).send().await
            );

            read_body(resp).await
        }
    }
}
