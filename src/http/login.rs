use serde::Deserialize;

pub(crate) static LOGIN_REQUEST_PATH: &str = "/session/v1/login-request";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponseSessionInfo {
    pub database_name: Option<String>,
    pub schema_name: Option<String>,
    pub warehouse_name: Option<String>,
    pub role_name: Option<String>,
}

// Field names follow the login-request response of the Snowflake REST API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthData {
    #[serde(rename = "validityInSeconds")]
    pub validity: Option<i64>,
    pub token: Option<String>,

    #[serde(rename = "masterValidityInSeconds")]
    pub master_validity: Option<i64>,
    pub master_token: Option<String>,

    pub server_version: Option<String>,

    #[serde(rename = "sessionId")]
    pub session_id: Option<i64>,

    pub session_info: Option<AuthResponseSessionInfo>,
}

pub(crate) type LoginResponse = super::GenericResponse<AuthData>;
