use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global tracing subscriber, writing to stderr so stdout only carries progress.
///
/// `RUST_LOG` takes precedence over the level picked from `verbose`.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let default_directive = if verbose {
        "snowflake_sql_runner=debug"
    } else {
        "snowflake_sql_runner=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}
