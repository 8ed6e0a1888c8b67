//! Script and assertion data model
//!
//! A script is one named unit of testing: setup statements executed for
//! side effect, then an ordered list of assertions. Scripts are built up
//! front and never mutated during a run.

use crate::value::Row;

/// Target database when a script does not name one.
pub const DEFAULT_DATABASE: &str = "test";

/// Expected outcome of one assertion.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// The query must succeed and produce exactly these rows, in order.
    Rows(Vec<Row>),
    /// The query must fail; any error counts.
    Error,
}

/// One query paired with its expected outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub query: String,
    pub expected: Expected,
    pub skip: bool,
}

impl Assertion {
    /// Assert that `query` succeeds and returns `rows`.
    pub fn rows(query: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            query: query.into(),
            expected: Expected::Rows(rows),
            skip: false,
        }
    }

    /// Assert that `query` fails with any error.
    pub fn error(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            expected: Expected::Error,
            skip: false,
        }
    }

    /// Mark this assertion skipped; it is recorded but never executed.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

/// A named unit of testing: setup statements plus ordered assertions.
#[derive(Debug, Clone)]
pub struct Script {
    /// Unique within a run; used as the sub-test label.
    pub name: String,
    /// Target database; [`DEFAULT_DATABASE`] unless overridden.
    pub database: String,
    /// Statements executed for side effect before any assertion. Must
    /// not error.
    pub setup: Vec<String>,
    pub assertions: Vec<Assertion>,
    /// Narrow the run to focused scripts; disallowed in CI.
    pub focus: bool,
    /// Record the whole script as skipped without executing it.
    pub skip: bool,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: DEFAULT_DATABASE.to_string(),
            setup: Vec::new(),
            assertions: Vec::new(),
            focus: false,
            skip: false,
        }
    }

    /// Set the target database; an empty name keeps the default.
    pub fn database(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.database = name;
        }
        self
    }

    /// Append a setup statement.
    pub fn setup(mut self, statement: impl Into<String>) -> Self {
        self.setup.push(statement.into());
        self
    }

    /// Append an assertion.
    pub fn assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn focused(mut self) -> Self {
        self.focus = true;
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_script_builder_defaults() {
        let script = Script::new("basic");
        assert_eq!(script.name, "basic");
        assert_eq!(script.database, DEFAULT_DATABASE);
        assert!(script.setup.is_empty());
        assert!(script.assertions.is_empty());
        assert!(!script.focus);
        assert!(!script.skip);
    }

    #[test]
    fn test_empty_database_keeps_default() {
        let script = Script::new("basic").database("");
        assert_eq!(script.database, DEFAULT_DATABASE);
        let script = Script::new("basic").database("parity");
        assert_eq!(script.database, "parity");
    }

    #[test]
    fn test_builder_preserves_order() {
        let script = Script::new("ordered")
            .setup("CREATE TABLE t (id INT)")
            .setup("INSERT INTO t VALUES (1)")
            .assertion(Assertion::rows("SELECT id FROM t", vec![vec![Value::Int32(1)]]))
            .assertion(Assertion::error("SELECT missing FROM t"));
        assert_eq!(script.setup[0], "CREATE TABLE t (id INT)");
        assert_eq!(script.setup[1], "INSERT INTO t VALUES (1)");
        assert_eq!(script.assertions[0].query, "SELECT id FROM t");
        assert_eq!(script.assertions[1].expected, Expected::Error);
    }

    #[test]
    fn test_skip_and_focus_flags() {
        let script = Script::new("flags").focused().skipped();
        assert!(script.focus);
        assert!(script.skip);
        let assertion = Assertion::error("SELECT 1/0").skipped();
        assert!(assertion.skip);
    }
}
