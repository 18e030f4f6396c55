use serde_json::json;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::{
    SnowflakeError,
    connection::Connection,
    driver::{QueryRequestBuilder, StatementOutcome},
    error,
    http::{
        self,
        client::SnowflakeHttpClient,
        close::{CLOSE_SESSION_PATH, CloseSessionResponse},
        login::{AuthData, LOGIN_REQUEST_PATH, LoginResponse},
        renew::{RenewSessionResponse, TOKEN_REQUEST_PATH},
    },
    this_errors,
};

#[cfg(test)]
#[path = "./session_test.rs"]
mod session_test;

pub(crate) struct Token {
    pub token: String,
    pub validity: Duration,
    pub issued_at: Instant,
}

impl Token {
    pub fn new(token_string: String, validity_in_seconds: i64) -> Self {
        let validity = Duration::from_secs(u64::try_from(validity_in_seconds).unwrap_or(0));

        Self {
            token: token_string,
            validity,
            issued_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now().duration_since(self.issued_at) >= self.validity
    }
}

/// A live, authenticated Snowflake session.
///
/// Statements run one at a time through [`Session::execute`]. The session is released with
/// [`Session::close`], which consumes it.
pub struct Session<C: SnowflakeHttpClient> {
    pub(crate) sequence_counter: u64,
    session_id: Option<i64>,
    token: Token,
    master_token: Token,
    conn: Connection<C>,
}

impl<C: SnowflakeHttpClient> Session<C> {
    pub(crate) async fn new(conn: Connection<C>) -> Result<Self, SnowflakeError> {
        let resp = Self::login(conn.clone()).await?;
        let session_id = resp.session_id;

        if let Some(info) = &resp.session_info {
            tracing::debug!(
                server_version = ?resp.server_version,
                database = ?info.database_name,
                schema = ?info.schema_name,
                warehouse = ?info.warehouse_name,
                role = ?info.role_name,
                "session context"
            );
        }

        let (token, master_token) = Self::tokens_from(resp)?;

        tracing::debug!(session_id = ?session_id, "snowflake session opened");

        Ok(Session {
            sequence_counter: 0,
            session_id,
            token,
            master_token,
            conn,
        })
    }

    fn tokens_from(resp: AuthData) -> Result<(Token, Token), SnowflakeError> {
        let token = resp
            .token
            .ok_or(error!("missing token in login response"))?;

        let master_token = resp
            .master_token
            .ok_or(error!("missing master_token in login response"))?;

        let validity = resp
            .validity
            .ok_or(error!("missing validity in login response"))?;

        let master_validity = resp
            .master_validity
            .ok_or(error!("missing master validity in login response"))?;

        Ok((
            Token::new(token, validity),
            Token::new(master_token, master_validity),
        ))
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    pub(crate) fn get_sequence_count(&mut self) -> u64 {
        let count = self.sequence_counter;
        self.sequence_counter += 1;
        count
    }

    pub(crate) async fn get_token(&mut self) -> Result<&str, SnowflakeError> {
        if self.token.is_expired() {
            if self.master_token.is_expired() {
                tracing::debug!("master token expired, logging in again");

                let resp = Self::login(self.conn.clone()).await?;
                self.session_id = resp.session_id;
                let (token, master_token) = Self::tokens_from(resp)?;
                self.token = token;
                self.master_token = master_token;
            } else {
                self.renew_token().await?;
            }
        }

        Ok(self.token.token.as_str())
    }

    pub(crate) fn get_conn(&self) -> Connection<C> {
        self.conn.clone()
    }

    async fn login(conn: Connection<C>) -> Result<AuthData, SnowflakeError> {
        let opts = conn.get_opts();
        let current_os = std::env::consts::OS;
        let current_os_arch = std::env::consts::ARCH;
        let os_version = format!("{current_os}-{current_os_arch}");

        let mut login_body = json!({
            "data": {
                // This *needs* to be Go. Snowflake API changes response types depending on the library used
                "CLIENT_APP_ID": "Go",
                "CLIENT_APP_VERSION": "1.18.1",
                "SVN_REVISION": "",
                "ACCOUNT_NAME": opts.account_id.as_str(),
                "LOGIN_NAME": opts.username.as_str(),
                "SESSION_PARAMETERS": {
                    "CLIENT_VALIDATE_DEFAULT_PARAMETERS": true,
                },
                "CLIENT_ENVIRONMENT": {
                    "APPLICATION": env!("CARGO_PKG_NAME"),
                    "OS": current_os,
                    "OS_VERSION": os_version,
                    "OCSP_MODE": "FAIL_OPEN",
                    "ISA": current_os_arch,
                },
            }
        });

        match &opts.strategy {
            super::AuthStrategy::Password(password) => {
                let obj_map = login_body["data"]
                    .as_object_mut()
                    .ok_or(error!("login body is missing its data object"))?;
                obj_map.insert("PASSWORD".to_string(), password.as_str().into());
            }
        };

        let params = http::params!(
            ("databaseName", opts.database.clone()),
            ("warehouse", opts.warehouse.clone()),
            ("schemaName", opts.schema.clone()),
            ("roleName", opts.role.clone()),
        );

        let mut headers = HashMap::new();
        headers.insert("ACCEPT".to_string(), "application/json".to_string());

        let request = this_errors!(
            "failed to build login request",
            http::RequestBuilder::default()
                .connection(conn.clone())
                .params(params)
                .path(LOGIN_REQUEST_PATH)
                .headers(headers)
                .build()
        );

        tracing::debug!(account = %opts.account_id, user = %opts.username, "logging in to snowflake");

        request.post::<LoginResponse>(login_body).await?.into_data()
    }

    async fn renew_token(&mut self) -> Result<(), SnowflakeError> {
        tracing::debug!("session token expired, renewing");

        let body = json!({
            "oldSessionToken": self.token.token,
            "requestType": "RENEW"
        });

        let request = this_errors!(
            "failed to build renew token request",
            http::RequestBuilder::default()
                .connection(self.conn.clone())
                .headers([("ACCEPT".to_string(), "application/snowflake".to_string())])
                .path(TOKEN_REQUEST_PATH)
                .auth_token(&self.master_token.token)
                .build()
        );

        let data = request.post::<RenewSessionResponse>(body).await?.into_data()?;

        self.token = Token::new(data.session_token, data.session_validity);
        self.master_token = Token::new(data.master_token, data.master_validity);

        Ok(())
    }

    /// Runs one statement to completion and reports what it did. Result rows are not fetched.
    pub async fn execute(&mut self, sql: &str) -> Result<StatementOutcome, SnowflakeError> {
        let query = this_errors!(
            "failed to build underlying query",
            QueryRequestBuilder::default()
                .accept_header("application/json")
                .sql_text(sql)
                .build()
        );

        let raw = query.run(self).await?;

        Ok(raw.into())
    }

    /// Token used to delete this session. Never logs in: a fresh login would be a different
    /// server session.
    async fn close_token(&mut self) -> Result<String, SnowflakeError> {
        if self.token.is_expired() {
            if self.master_token.is_expired() {
                tracing::debug!(
                    session_id = ?self.session_id,
                    "master token expired, closing with the last session token"
                );
            } else {
                self.renew_token().await?;
            }
        }

        Ok(self.token.token.clone())
    }

    /// Logs the session out. Consuming `self` makes a second close impossible.
    pub async fn close(mut self) -> Result<(), SnowflakeError> {
        let conn = self.get_conn();
        let token = self.close_token().await?;

        let request = this_errors!(
            "failed to build close session request",
            http::RequestBuilder::default()
                .connection(conn)
                .path(CLOSE_SESSION_PATH)
                .params(http::params!(("delete", "true")))
                .auth_token(token)
                .build()
        );

        let resp = request.post::<CloseSessionResponse>(json!({})).await?;

        if !resp.success {
            return Err(SnowflakeError::server(
                "Session::close",
                resp.message
                    .unwrap_or_else(|| "failed to close session".to_string()),
                resp.code,
                None,
            ));
        }

        tracing::debug!(session_id = ?self.session_id, "snowflake session closed");

        Ok(())
    }
}
