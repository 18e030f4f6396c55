use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{
    SnowflakeError,
    config::ConfigError,
    factory::SessionFactory,
    script::{Statement, split_statements},
    warehouse::{Warehouse, WarehouseSession},
};

#[cfg(test)]
#[path = "./runner_test.rs"]
mod runner_test;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("no SQL file given (usage: run-sql <sql_file>)")]
    Usage,

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("cannot read SQL file {}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open snowflake session")]
    Connect(#[source] SnowflakeError),

    #[error("statement {ordinal} failed: {statement}")]
    StatementExecution {
        ordinal: usize,
        statement: String,
        #[source]
        source: SnowflakeError,
    },

    #[error("failed to close snowflake session")]
    SessionClose(#[source] SnowflakeError),

    #[error("failed to write progress output")]
    Output(#[source] io::Error),
}

impl RunError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Usage => 2,
            _ => 1,
        }
    }
}

/// Where a run currently is. Any phase can move to `Failed`; once a session was opened the
/// run always passes through `SessionClosed` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    ValidatingInput,
    SessionOpen,
    Executing,
    SessionClosed,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub statements_executed: usize,
    pub rows_affected: i64,
}

struct PhaseTracker {
    current: RunPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            current: RunPhase::Idle,
        }
    }

    fn enter(&mut self, next: RunPhase) {
        tracing::debug!(from = ?self.current, to = ?next, "run phase");
        self.current = next;
    }

    fn fail(&mut self, err: RunError) -> RunError {
        self.enter(RunPhase::Failed);
        err
    }
}

/// Runs every statement of a SQL file, in order, on one session.
pub struct ScriptRunner<W: Warehouse> {
    factory: SessionFactory<W>,
}

impl<W: Warehouse> ScriptRunner<W> {
    pub fn new(factory: SessionFactory<W>) -> Self {
        Self { factory }
    }

    /// Runs the file at `file_path`, printing progress to stdout.
    pub async fn run(&self, file_path: Option<&Path>) -> Result<RunSummary, RunError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with_output(file_path, &mut out).await
    }

    /// Runs the file at `file_path`, printing a progress block to `out` before each statement.
    ///
    /// The file is read before any connection is made. Once the session is open it is closed
    /// exactly once, whether the statements succeed or not. The first failing statement stops
    /// the run.
    pub async fn run_with_output(
        &self,
        file_path: Option<&Path>,
        out: &mut impl Write,
    ) -> Result<RunSummary, RunError> {
        let mut phase = PhaseTracker::new();

        phase.enter(RunPhase::ValidatingInput);
        let statements = read_statements(file_path).map_err(|e| phase.fail(e))?;

        tracing::debug!(count = statements.len(), "statements to run");

        let mut session = self
            .factory
            .create_session()
            .await
            .map_err(|e| phase.fail(RunError::Connect(e)))?;
        phase.enter(RunPhase::SessionOpen);

        let outcome = execute_all(&mut session, &statements, out, &mut phase).await;

        let closed = session.close().await;
        phase.enter(RunPhase::SessionClosed);

        match (outcome, closed) {
            (Ok(summary), Ok(())) => {
                phase.enter(RunPhase::Done);
                tracing::info!(
                    statements = summary.statements_executed,
                    rows_affected = summary.rows_affected,
                    "script finished"
                );
                Ok(summary)
            }
            (Ok(_), Err(e)) => Err(phase.fail(RunError::SessionClose(e))),
            (Err(e), Ok(())) => Err(phase.fail(e)),
            (Err(e), Err(close_err)) => {
                tracing::warn!(error = %close_err, "failed to close session after error");
                Err(phase.fail(e))
            }
        }
    }
}

fn read_statements(file_path: Option<&Path>) -> Result<Vec<Statement>, RunError> {
    let path = file_path.ok_or(RunError::Usage)?;

    let script = std::fs::read_to_string(path).map_err(|source| RunError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(split_statements(&script))
}

async fn execute_all<S: WarehouseSession>(
    session: &mut S,
    statements: &[Statement],
    out: &mut impl Write,
    phase: &mut PhaseTracker,
) -> Result<RunSummary, RunError> {
    let mut summary = RunSummary::default();

    for statement in statements {
        phase.enter(RunPhase::Executing);

        writeln!(out, "Executing SQL statement:\n{}", statement.text).map_err(RunError::Output)?;
        out.flush().map_err(RunError::Output)?;

        let outcome = session.execute(&statement.text).await.map_err(|source| {
            RunError::StatementExecution {
                ordinal: statement.ordinal,
                statement: statement.text.clone(),
                source,
            }
        })?;

        tracing::info!(
            ordinal = statement.ordinal,
            query_id = outcome.query_id.as_deref().unwrap_or("-"),
            kind = ?outcome.kind,
            rows_affected = outcome.rows_affected,
            "statement executed"
        );

        summary.statements_executed += 1;
        summary.rows_affected = summary.rows_affected.saturating_add(outcome.rows_affected);
    }

    Ok(summary)
}
