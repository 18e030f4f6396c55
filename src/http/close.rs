pub(crate) static CLOSE_SESSION_PATH: &str = "/session";

// The close route answers with `"data": null`, only the envelope matters.
pub(crate) type CloseSessionResponse = super::GenericResponse<serde_json::Value>;
