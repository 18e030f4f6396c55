use std::collections::HashMap;

use derive_builder::Builder;
use serde_json::json;

use crate::{
    SnowflakeError,
    auth::session::Session,
    http::{self, client::SnowflakeHttpClient},
    this_errors,
};

pub(crate) mod response;

static QUERY_REQUEST_PATH: &str = "/queries/v1/query-request";

/// What kind of statement the warehouse reported having run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    Query,
    Dml,
    #[default]
    Other,
}

/// Summary of an executed statement. Result rows are discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementOutcome {
    pub query_id: Option<String>,
    pub kind: StatementKind,
    pub rows_affected: i64,
}

impl From<response::RawQueryResponse> for StatementOutcome {
    fn from(raw: response::RawQueryResponse) -> Self {
        let kind = if raw.is_dql() {
            StatementKind::Query
        } else if raw.is_dml() {
            StatementKind::Dml
        } else {
            StatementKind::Other
        };

        Self {
            rows_affected: raw.rows_affected(),
            query_id: raw.query_id,
            kind,
        }
    }
}

#[derive(Builder)]
pub(crate) struct QueryRequest {
    #[builder(setter(into))]
    pub sql_text: String,

    #[builder(setter(into), default = "\"application/json\".into()")]
    pub accept_header: String,
}

impl QueryRequest {
    pub async fn run<C: SnowflakeHttpClient>(
        self,
        session: &mut Session<C>,
    ) -> Result<response::RawQueryResponse, SnowflakeError> {
        let mut headers = HashMap::new();
        headers.insert("ACCEPT".to_string(), self.accept_header.clone());

        let body = json!({
            "sqlText": self.sql_text,
            "sequenceId": session.get_sequence_count(),
            "describeOnly": false,
            "bindings": {},
            "asyncExec": false,
            "isInternal": false,
        });

        let conn = session.get_conn();
        let token = session.get_token().await?;
        let request = this_errors!(
            "failed to build query request",
            http::RequestBuilder::default()
                .path(QUERY_REQUEST_PATH)
                .connection(conn)
                .headers(headers.clone())
                .auth_token(token)
                .build()
        );

        let mut state = request
            .post::<response::ExecResponse>(body)
            .await?
            .into_state()?;

        // The result url long-polls server side, so it is requested again straight away
        loop {
            match state {
                response::ExecState::Finished(raw) => return Ok(raw),
                response::ExecState::InProgress { result_url } => {
                    tracing::debug!(%result_url, "statement still running, polling for result");

                    let conn = session.get_conn();
                    let token = session.get_token().await?;
                    let request = this_errors!(
                        "failed to build result request",
                        http::RequestBuilder::default()
                            .path(result_url)
                            .connection(conn)
                            .headers(headers.clone())
                            .auth_token(token)
                            .build()
                    );

                    state = request.get::<response::ExecResponse>().await?.into_state()?;
                }
            }
        }
    }
}
