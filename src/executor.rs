//! Runs one script's setup and assertions over a single session
//!
//! Setup errors are fatal and abort the script. Assertion outcomes are
//! isolated: a failed assertion never stops its successors, which run on
//! the same session and may observe state it left behind.

use mysql_async::prelude::Queryable;
use mysql_async::Conn;
use tokio::sync::oneshot;

use crate::compare::{compare_results, Comparison, Tolerances};
use crate::error::{HarnessError, HarnessResult};
use crate::reader::read_result;
use crate::script::{Assertion, Expected, Script};

/// Outcome of one assertion.
#[derive(Debug, Clone, PartialEq)]
pub enum AssertionOutcome {
    Passed,
    /// Excluded from pass/fail accounting.
    Skipped,
    /// Carries the full expected and actual result sets for diagnosis.
    Failed(String),
}

/// Outcome of one script: one entry per assertion, labeled by the
/// assertion's literal query text.
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub script: String,
    /// Whole script was skipped; no assertions ran.
    pub skipped: bool,
    /// The script was aborted by a fatal error (bootstrap or setup
    /// failure). Assertions past that point never ran.
    pub fatal: Option<String>,
    pub assertions: Vec<(String, AssertionOutcome)>,
}

impl ScriptReport {
    pub fn skipped(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            skipped: true,
            fatal: None,
            assertions: Vec::new(),
        }
    }

    pub fn fatal(script: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            skipped: false,
            fatal: Some(error.into()),
            assertions: Vec::new(),
        }
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, AssertionOutcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AssertionOutcome::Failed(_)))
    }

    pub fn skipped_assertions(&self) -> usize {
        self.count(|o| matches!(o, AssertionOutcome::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&AssertionOutcome) -> bool) -> usize {
        self.assertions.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Run `script` to completion on `conn`.
///
/// Assertions execute strictly in declaration order; no rollback happens
/// between them unless the script's own statements arrange one.
pub async fn run_script(
    conn: &mut Conn,
    script: &Script,
    tolerances: &Tolerances,
) -> HarnessResult<ScriptReport> {
    if script.skip {
        tracing::info!(script = %script.name, "script skipped");
        return Ok(ScriptReport::skipped(script.name.clone()));
    }

    for statement in &script.setup {
        conn.query_drop(statement.as_str())
            .await
            .map_err(|source| HarnessError::Setup {
                script: script.name.clone(),
                statement: statement.clone(),
                source,
            })?;
    }

    let mut assertions = Vec::with_capacity(script.assertions.len());
    for assertion in &script.assertions {
        let outcome = run_assertion(conn, assertion, tolerances).await;
        match &outcome {
            AssertionOutcome::Passed => {
                tracing::debug!(script = %script.name, query = %assertion.query, "assertion passed");
            }
            AssertionOutcome::Skipped => {
                tracing::info!(script = %script.name, query = %assertion.query, "assertion skipped");
            }
            AssertionOutcome::Failed(reason) => {
                tracing::error!(script = %script.name, query = %assertion.query, %reason, "assertion failed");
            }
        }
        assertions.push((assertion.query.clone(), outcome));
    }

    Ok(ScriptReport {
        script: script.name.clone(),
        skipped: false,
        fatal: None,
        assertions,
    })
}

/// Variant of [`run_script`] that abandons outstanding work as soon as
/// `cancel` fires.
pub async fn run_script_with_cancel(
    conn: &mut Conn,
    script: &Script,
    tolerances: &Tolerances,
    cancel: oneshot::Receiver<()>,
) -> HarnessResult<ScriptReport> {
    cancellable(run_script(conn, script, tolerances), cancel).await
}

/// Race `work` against the cancel signal; cancellation wins promptly
/// and fails the outstanding operation instead of letting it hang.
async fn cancellable<T>(
    work: impl std::future::Future<Output = HarnessResult<T>>,
    mut cancel: oneshot::Receiver<()>,
) -> HarnessResult<T> {
    tokio::select! {
        result = work => result,
        _ = &mut cancel => Err(HarnessError::Cancelled),
    }
}

async fn run_assertion(
    conn: &mut Conn,
    assertion: &Assertion,
    tolerances: &Tolerances,
) -> AssertionOutcome {
    if assertion.skip {
        return AssertionOutcome::Skipped;
    }

    let result = read_result(conn, &assertion.query).await;
    match (&assertion.expected, result) {
        (Expected::Error, Err(_)) => AssertionOutcome::Passed,
        (Expected::Error, Ok(output)) => AssertionOutcome::Failed(format!(
            "expected an error, query succeeded with {} row(s): {:?}",
            output.rows.len(),
            output.rows
        )),
        (Expected::Rows(_), Err(error)) => {
            AssertionOutcome::Failed(format!("unexpected error: {error}"))
        }
        (Expected::Rows(expected), Ok(output)) => {
            match compare_results(expected, &output.rows, tolerances) {
                Comparison::Equivalent => AssertionOutcome::Passed,
                Comparison::NotEquivalent(why) => AssertionOutcome::Failed(format!(
                    "{why}\nexpected: {expected:?}\nactual:   {:?}",
                    output.rows
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(outcomes: Vec<AssertionOutcome>) -> ScriptReport {
        ScriptReport {
            script: "accounting".to_string(),
            skipped: false,
            fatal: None,
            assertions: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, o)| (format!("SELECT {i};"), o))
                .collect(),
        }
    }

    #[test]
    fn test_report_accounting() {
        let report = report_with(vec![
            AssertionOutcome::Passed,
            AssertionOutcome::Skipped,
            AssertionOutcome::Failed("boom".to_string()),
            AssertionOutcome::Passed,
        ]);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped_assertions(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_skips_do_not_fail_a_report() {
        let report = report_with(vec![AssertionOutcome::Skipped, AssertionOutcome::Skipped]);
        assert_eq!(report.passed(), 0);
        assert!(report.is_success());
    }

    #[test]
    fn test_skipped_script_report() {
        let report = ScriptReport::skipped("whole_script");
        assert!(report.skipped);
        assert!(report.assertions.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn test_fatal_script_report_fails() {
        let report = ScriptReport::fatal("broken", "setup statement failed");
        assert!(!report.is_success());
        assert_eq!(report.failed(), 0);
        assert_eq!(report.fatal.as_deref(), Some("setup statement failed"));
    }

    #[tokio::test]
    async fn test_cancel_fails_outstanding_work_promptly() {
        let (tx, rx) = oneshot::channel();
        tx.send(()).expect("receiver alive");

        // The work never resolves on its own; only the cancel signal can
        // finish the race.
        let outcome = cancellable(std::future::pending::<HarnessResult<()>>(), rx).await;
        assert!(matches!(outcome, Err(HarnessError::Cancelled)));
    }

    #[tokio::test]
    async fn test_unfired_cancel_lets_work_finish() {
        let (_tx, rx) = oneshot::channel::<()>();
        let outcome = cancellable(std::future::ready(Ok(7)), rx).await;
        assert_eq!(outcome.unwrap(), 7);
    }
}
