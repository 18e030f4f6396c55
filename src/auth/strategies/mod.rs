use std::fmt::Debug;

// Snowflake Auth Strategies can be found here:
// https://github.com/snowflakedb/gosnowflake/blob/master/auth.go#L139
#[derive(Clone)]
pub enum AuthStrategy {
    Password(String),
}

impl Debug for AuthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStrategy::Password(_) => f.write_str("Password(****)"),
        }
    }
}
