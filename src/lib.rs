//! sqlparity - wire-protocol parity harness for SQL engines
//!
//! Starts an ephemeral engine binary, drives it over the MySQL wire
//! protocol with scripted queries, and checks observed results against
//! expected rows. Floats and decimals compare under a fixed absolute
//! tolerance so engines with different numeric implementations can still
//! be verified against reference results; every other type compares
//! exactly.

pub mod compare;
pub mod error;
pub mod executor;
pub mod reader;
pub mod runner;
pub mod script;
pub mod server;
pub mod value;

pub use compare::{compare_results, compare_rows, compare_values};
pub use compare::{Comparison, Tolerances, FLOAT_TOLERANCE};
pub use error::{HarnessError, HarnessResult};
pub use executor::{run_script, run_script_with_cancel, AssertionOutcome, ScriptReport};
pub use reader::{read_result, QueryOutput};
pub use runner::{RunReport, SuiteRunner, CI_ENV_VAR};
pub use script::{Assertion, Expected, Script, DEFAULT_DATABASE};
pub use server::{EngineConfig, RetryPolicy, TestEngine};
pub use value::{ColumnKind, Row, Value};
