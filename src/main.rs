//! `run-sql <sql_file>`: runs every `;` separated statement of a file against Snowflake.
//!
//! Connection parameters come from `SNOWFLAKE_ACCOUNT`, `SNOWFLAKE_USER`, `SNOWFLAKE_PASSWORD`,
//! `SNOWFLAKE_ROLE`, `SNOWFLAKE_WAREHOUSE` and optionally `SNOWFLAKE_DATABASE`,
//! `SNOWFLAKE_SCHEMA` and `SNOWFLAKE_HOST`.

use std::{error::Error, path::PathBuf, process::ExitCode};

use clap::Parser;

use snowflake_sql_runner::{
    DatabasePolicy, RunError, ScriptRunner, SessionFactory, config::DEFAULT_DATABASE, logging,
};

#[derive(Parser, Debug)]
#[command(name = "run-sql")]
#[command(version, about = "Execute the statements of a SQL file against Snowflake", long_about = None)]
struct Cli {
    /// File of `;` separated SQL statements
    sql_file: Option<PathBuf>,

    /// Fail when SNOWFLAKE_DATABASE is not set instead of using --default-database
    #[arg(long = "require-database", conflicts_with = "default_database")]
    require_database: bool,

    /// Database used when SNOWFLAKE_DATABASE is not set
    #[arg(long = "default-database", default_value = DEFAULT_DATABASE)]
    default_database: String,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn database_policy(&self) -> DatabasePolicy {
        if self.require_database {
            DatabasePolicy::Required
        } else {
            DatabasePolicy::Fallback(self.default_database.clone())
        }
    }
}

async fn run(cli: Cli) -> Result<(), RunError> {
    // Checked before the environment so a bare invocation reports usage
    let sql_file = cli.sql_file.as_deref().ok_or(RunError::Usage)?;

    let factory = SessionFactory::from_env(&cli.database_policy())?;
    let runner = ScriptRunner::new(factory);

    runner.run(Some(sql_file)).await?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("warning: failed to initialise logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");

            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }

            ExitCode::from(err.exit_code())
        }
    }
}
