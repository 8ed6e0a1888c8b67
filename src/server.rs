//! Engine process bootstrap and teardown
//!
//! Spawns one ephemeral engine binary per script on an unused local
//! port, absorbs the race between "process started" and "port accepting
//! connections" with a bounded retry, and guarantees the process is
//! stopped and reaped on every exit path.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder};
use tempfile::TempDir;
use tokio::process::{Child, Command};

use crate::error::{HarnessError, HarnessResult};
use crate::script::DEFAULT_DATABASE;

/// Bounded connect-retry policy for the initial control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total connection attempts, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// The sleep schedule this policy produces: one entry per gap
    /// between attempts. Pure, so the policy is testable without
    /// sleeping.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::repeat(self.delay).take(self.max_attempts.saturating_sub(1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// How to launch and connect to the engine under test.
///
/// The engine binary is invoked as `<program> <args...> <port> <data-dir>`,
/// mirroring the conventional positional interface of embedded test
/// servers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the engine binary.
    pub program: PathBuf,
    /// Extra arguments placed before the generated port and data dir.
    pub args: Vec<String>,
    /// Administrative credential used for the control connection.
    pub admin_user: String,
    pub admin_password: String,
    pub retry: RetryPolicy,
}

impl EngineConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            admin_user: "root".to_string(),
            admin_password: String::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn admin(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.admin_user = user.into();
        self.admin_password = password.into();
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn command(&self, port: u16, data_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(port.to_string())
            .arg(data_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn opts(&self, port: u16, database: Option<&str>) -> Opts {
        OptsBuilder::default()
            .ip_or_hostname("127.0.0.1")
            .tcp_port(port)
            .user(Some(self.admin_user.clone()))
            .pass(Some(self.admin_password.clone()))
            .db_name(database)
            .into()
    }
}

/// One running engine instance plus the session bound to its script's
/// target database. Exclusively owned by one script run; the port and
/// process are never shared.
pub struct TestEngine {
    session: Conn,
    child: Child,
    port: u16,
    _data_dir: TempDir,
}

impl TestEngine {
    /// Start an engine on an unused local port and open a session bound
    /// to `database` (empty selects the default database).
    ///
    /// A non-default database is created over a short-lived admin
    /// control connection before the session opens.
    pub async fn start(config: &EngineConfig, database: &str) -> HarnessResult<Self> {
        let database = if database.is_empty() {
            DEFAULT_DATABASE
        } else {
            database
        };

        let port = free_port()?;
        let data_dir = TempDir::new().map_err(HarnessError::Spawn)?;
        let child = config
            .command(port, data_dir.path())
            .spawn()
            .map_err(HarnessError::Spawn)?;
        tracing::debug!(program = %config.program.display(), port, "engine spawned");

        let mut admin = connect_with_retry(config, port).await?;
        if database != DEFAULT_DATABASE {
            admin
                .query_drop(format!("CREATE DATABASE {database};"))
                .await
                .map_err(|source| HarnessError::CreateDatabase {
                    database: database.to_string(),
                    source,
                })?;
        }
        admin.disconnect().await?;

        let session = Conn::new(config.opts(port, Some(database))).await?;
        tracing::info!(port, database, "engine ready");

        Ok(Self {
            session,
            child,
            port,
            _data_dir: data_dir,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The open session; all of a script's statements run through it.
    pub fn session(&mut self) -> &mut Conn {
        &mut self.session
    }

    /// Close the session, stop the engine, and await confirmed exit.
    pub async fn shutdown(self) {
        let TestEngine {
            session,
            mut child,
            port,
            _data_dir,
        } = self;

        // The engine may already be gone; none of this is allowed to
        // mask the script's outcome.
        if let Err(error) = session.disconnect().await {
            tracing::debug!(%error, "session disconnect failed during shutdown");
        }
        if let Err(error) = child.start_kill() {
            tracing::debug!(%error, "engine stop request failed");
        }
        match child.wait().await {
            Ok(status) => tracing::info!(port, %status, "engine stopped"),
            Err(error) => tracing::warn!(port, %error, "failed to reap engine process"),
        }
    }
}

async fn connect_with_retry(config: &EngineConfig, port: u16) -> HarnessResult<Conn> {
    let opts = config.opts(port, None);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match Conn::new(opts.clone()).await {
            Ok(conn) => return Ok(conn),
            Err(source) if attempt < config.retry.max_attempts => {
                tracing::debug!(attempt, error = %source, "engine not accepting connections yet");
                tokio::time::sleep(config.retry.delay).await;
            }
            Err(source) => {
                return Err(HarnessError::Connect {
                    attempts: attempt,
                    source,
                })
            }
        }
    }
}

/// Reserve an unused local port by binding port 0 and releasing it.
fn free_port() -> HarnessResult<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(HarnessError::Port)?;
    let port = listener.local_addr().map_err(HarnessError::Port)?.port();
    Ok(port)
}
