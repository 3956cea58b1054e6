//! Test harness for task replay scenarios.
//!
//! Scripts tasks, runs them through the real host path against the mock
//! authority, and checks the stored results, artifacts and log stream.
//!
//! # Key Components
//!
//! - [`TaskBuilder`] - Fluent construction of task files
//! - [`Workspace`] - Temporary shared directory with a host and authority
//! - [`oracle`] - Verification functions returning pass/fail verdicts
//! - [`report`] - Plain-text task reports
//! - [`helpers`] - Error type and operation constructors
//! - [`assertions`] - Assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use report::ResultReport;
pub use workflow::{ScenarioRun, TaskBuilder, Workspace};
