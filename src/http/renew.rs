use serde::Deserialize;

pub(crate) static TOKEN_REQUEST_PATH: &str = "/session/token-request";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenewSessionData {
    #[serde(rename = "validityInSecondsST")]
    pub(crate) session_validity: i64,
    pub(crate) session_token: String,

    #[serde(rename = "validityInSecondsMT")]
    pub(crate) master_validity: i64,
    pub(crate) master_token: String,
}

pub(crate) type RenewSessionResponse = super::GenericResponse<RenewSessionData>;
