//! Suite runner: focus filtering, CI safety rail, sequential execution
//!
//! Each selected script gets a fresh engine instance on its own port,
//! torn down on every exit path. Focus mode narrows a local run to the
//! focused scripts and is a fatal error under CI so an accidentally
//! committed focus flag can never silently shrink a CI run.

use crate::compare::Tolerances;
use crate::error::{HarnessError, HarnessResult};
use crate::executor::{run_script, ScriptReport};
use crate::script::Script;
use crate::server::{EngineConfig, TestEngine};

/// Environment variable whose presence (value irrelevant) marks a CI run.
pub const CI_ENV_VAR: &str = "CI";

/// Runs a collection of scripts sequentially.
pub struct SuiteRunner {
    config: EngineConfig,
    tolerances: Tolerances,
}

/// Aggregate outcome of one suite run, one entry per executed script.
/// Scripts excluded by focus mode are absent entirely.
#[derive(Debug, Default)]
pub struct RunReport {
    pub scripts: Vec<ScriptReport>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.scripts.iter().map(ScriptReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.scripts.iter().map(ScriptReport::failed).sum()
    }

    /// Assertion-level skips across all executed scripts.
    pub fn skipped(&self) -> usize {
        self.scripts.iter().map(ScriptReport::skipped_assertions).sum()
    }

    pub fn skipped_scripts(&self) -> usize {
        self.scripts.iter().filter(|s| s.skipped).count()
    }

    /// Scripts aborted by a fatal error (bootstrap or setup failure).
    pub fn fatal_scripts(&self) -> usize {
        self.scripts.iter().filter(|s| s.fatal.is_some()).count()
    }

    pub fn is_success(&self) -> bool {
        self.scripts.iter().all(ScriptReport::is_success)
    }
}

impl SuiteRunner {
    pub fn new(config: EngineConfig, tolerances: Tolerances) -> Self {
        Self { config, tolerances }
    }

    /// Run `scripts`, detecting CI from the process environment.
    pub async fn run(&self, scripts: &[Script]) -> HarnessResult<RunReport> {
        let ci = std::env::var_os(CI_ENV_VAR).is_some();
        self.run_with_ci_flag(scripts, ci).await
    }

    /// Run `scripts` with the CI flag injected, keeping the focus rail
    /// testable without touching the process environment.
    ///
    /// Only the focus-in-CI pre-pass returns `Err`. A fatal error while
    /// running one script (spawn, connect, CREATE DATABASE, setup) is
    /// recorded against that script and never stops its siblings.
    pub async fn run_with_ci_flag(
        &self,
        scripts: &[Script],
        ci: bool,
    ) -> HarnessResult<RunReport> {
        let selected = select_scripts(scripts, ci)?;

        let mut report = RunReport::default();
        for script in selected {
            let outcome = match self.run_one(script).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::error!(script = %script.name, %error, "script aborted by fatal error");
                    ScriptReport::fatal(script.name.clone(), error.to_string())
                }
            };
            report.scripts.push(outcome);
        }

        tracing::info!(
            scripts = report.scripts.len(),
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            fatal = report.fatal_scripts(),
            "suite finished"
        );
        Ok(report)
    }

    async fn run_one(&self, script: &Script) -> HarnessResult<ScriptReport> {
        // A skipped script never boots an engine.
        if script.skip {
            tracing::info!(script = %script.name, "script skipped");
            return Ok(ScriptReport::skipped(script.name.clone()));
        }

        let mut engine = TestEngine::start(&self.config, &script.database).await?;
        let result = run_script(engine.session(), script, &self.tolerances).await;
        engine.shutdown().await;
        result
    }
}

/// Focus pre-pass: narrow to focused scripts when any exist, and refuse
/// to do so under CI.
fn select_scripts(scripts: &[Script], ci: bool) -> HarnessResult<Vec<&Script>> {
    let focused: Vec<&Script> = scripts.iter().filter(|s| s.focus).collect();
    if focused.is_empty() {
        return Ok(scripts.iter().collect());
    }
    if ci {
        return Err(HarnessError::FocusInCi {
            script: focused[0].name.clone(),
        });
    }
    tracing::warn!(
        focused = focused.len(),
        total = scripts.len(),
        "focus mode: narrowing run to focused scripts"
    );
    Ok(focused)
}
