use serde::Deserialize;

use crate::{SnowflakeError, error, http::GenericResponse, this_errors};

static STATEMENT_TYPE_ID_SELECT: i64 = 0x1000;
static STATEMENT_TYPE_ID_DML: i64 = 0x3000;
static STATEMENT_TYPE_ID_MULTI_TABLE_INSERT: i64 = STATEMENT_TYPE_ID_DML + 0x500;

// Response codes for a query that is still running server side.
static QUERY_IN_PROGRESS_CODE: &str = "333333";
static QUERY_IN_PROGRESS_ASYNC_CODE: &str = "333334";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct QueryStats {
    pub num_dml_duplicates: i64,
    pub num_rows_inserted: i64,
    pub num_rows_updated: i64,
    pub num_rows_deleted: i64,
}

/// The parts of a finished query response the runner cares about. Rows are never fetched.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawQueryResponse {
    pub(crate) query_id: Option<String>,

    #[serde(default)]
    pub(crate) statement_type_id: i64,

    pub(crate) stats: Option<QueryStats>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ExecResponseErrorData {
    query_id: Option<String>,
    sql_state: Option<String>,
    error_code: Option<String>,
}

pub(crate) type ExecResponse = GenericResponse<serde_json::Value>;

/// Where a query-request response leaves the statement.
#[derive(Debug)]
pub(crate) enum ExecState {
    Finished(RawQueryResponse),
    InProgress { result_url: String },
}

impl ExecResponse {
    pub(crate) fn into_state(self) -> Result<ExecState, SnowflakeError> {
        let code = self.code.as_deref();

        if code == Some(QUERY_IN_PROGRESS_CODE) || code == Some(QUERY_IN_PROGRESS_ASYNC_CODE) {
            let result_url = self
                .data
                .as_ref()
                .and_then(|data| data.get("getResultUrl"))
                .and_then(|url| url.as_str())
                .ok_or(error!("query in progress without a result url"))?;

            return Ok(ExecState::InProgress {
                result_url: result_url.to_string(),
            });
        }

        if !self.success {
            let details = match self.data {
                Some(data) => serde_json::from_value::<ExecResponseErrorData>(data).unwrap_or_default(),
                None => ExecResponseErrorData::default(),
            };

            let mut message = self
                .message
                .unwrap_or_else(|| "statement failed without a message".to_string());
            if let Some(query_id) = details.query_id {
                message = format!("{} [query id {}]", message, query_id);
            }

            return Err(SnowflakeError::server(
                "ExecResponse::into_state",
                message,
                self.code.or(details.error_code),
                details.sql_state,
            ));
        }

        let data = self
            .data
            .ok_or(error!("missing data in query response"))?;

        // PUT/GET answer with a file transfer command instead of a result
        if data.get("command").is_some() {
            return Err(error!("PUT/GET file transfer statements are not supported"));
        }

        let raw = this_errors!(
            "failed to parse query response",
            serde_json::from_value::<RawQueryResponse>(data)
        );

        Ok(ExecState::Finished(raw))
    }
}

impl RawQueryResponse {
    pub fn is_dml(&self) -> bool {
        STATEMENT_TYPE_ID_DML <= self.statement_type_id
            && self.statement_type_id <= STATEMENT_TYPE_ID_MULTI_TABLE_INSERT
    }

    pub fn is_dql(&self) -> bool {
        self.statement_type_id == STATEMENT_TYPE_ID_SELECT
    }

    pub fn rows_affected(&self) -> i64 {
        self.stats
            .as_ref()
            .map(|x| {
                x.num_rows_updated
                    .saturating_add(x.num_dml_duplicates)
                    .saturating_add(x.num_rows_deleted)
                    .saturating_add(x.num_rows_inserted)
            })
            .unwrap_or(0)
    }
}
