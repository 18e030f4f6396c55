use std::error::Error;
use std::fmt::{Debug, Display};

/// Error raised by the Snowflake driver layer.
///
/// `trace` is the function that produced the error, `code` and `sql_state` are filled in
/// when the Snowflake API reported them.
#[derive(Clone)]
pub struct SnowflakeError {
    trace: String,
    message: String,
    underlying_error: Option<String>,
    code: Option<String>,
    sql_state: Option<String>,
}

impl SnowflakeError {
    pub fn new(trace: impl Into<String>, message: impl Into<String>, underlying: Option<String>) -> Self {
        Self {
            trace: trace.into(),
            message: message.into(),
            underlying_error: underlying,
            code: None,
            sql_state: None,
        }
    }

    /// An error reported by the Snowflake API itself, e.g. a compilation error for a statement.
    pub fn server(
        trace: impl Into<String>,
        message: impl Into<String>,
        code: Option<String>,
        sql_state: Option<String>,
    ) -> Self {
        Self {
            trace: trace.into(),
            message: message.into(),
            underlying_error: None,
            code,
            sql_state,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }
}

impl Error for SnowflakeError {}

impl Display for SnowflakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.sql_state) {
            (Some(code), Some(state)) => {
                write!(f, "{} (code {}, sql state {})", self.message, code, state)
            }
            (Some(code), None) => write!(f, "{} (code {})", self.message, code),
            _ => {
                let error_name = self.underlying_error.as_deref().unwrap_or("SnowflakeError");
                write!(f, "[{}]: {}", error_name, self.message)
            }
        }
    }
}

impl Debug for SnowflakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let error_name = self.underlying_error.as_deref().unwrap_or("SnowflakeError");
        write!(f, "[{}] ({}): {}", error_name, self.trace, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " code={}", code)?;
        }
        if let Some(state) = &self.sql_state {
            write!(f, " sql_state={}", state)?;
        }
        Ok(())
    }
}

macro_rules! this_errors {
    ($msg:literal, $val:expr) => {
        $val.map_err(|e| $crate::error!($msg, e))?
    };
}

macro_rules! error {
    ($val:literal) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let fun_name = &name[..name.len() - 3];
        $crate::errors::SnowflakeError::new(fun_name, $val, None)
    }};
    ($err:expr) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let err = $err;
        let name = type_name_of(f);
        let error_type_name = type_name_of(&err);
        let fun_name = &name[..name.len() - 3];
        // Plain messages are not errors of their own
        let error_name = error_type_name
            .split("::")
            .last()
            .filter(|x| !matches!(x.trim_start_matches('&'), "str" | "String"))
            .map(|x| x.to_string());
        let error_msg = format!("{}", err);

        $crate::errors::SnowflakeError::new(fun_name, error_msg, error_name)
    }};
    ($val:literal, $err:expr) => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let err = $err;
        let name = type_name_of(f);
        let error_type_name = type_name_of(&err);
        let fun_name = &name[..name.len() - 3];
        let error_name = error_type_name.split("::").last().map(|x| x.to_string());
        let final_msg = format!("{} - {}", $val, err);
        $crate::errors::SnowflakeError::new(fun_name, final_msg, error_name)
    }};
}

pub(crate) use error;
pub(crate) use this_errors;
