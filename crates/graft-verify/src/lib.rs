//! Graft Verification
//!
//! After a deployment, proves the change compiles and did not break anyone
//! else — without rebuilding or re-testing the whole codebase.
//!
//! # Overview
//!
//! - [`ToolLocator`]: finds the external build/test tool from an ordered
//!   candidate list plus an optional discovery command, injected at
//!   construction
//! - [`BuildOrchestrator`]: rebuilds the touched modules and their direct
//!   dependents, in order, continuing past individual failures
//! - [`VerificationRunner`]: runs only the newly deployed test units,
//!   bounded by a concurrency limit, and classifies failures as new-test
//!   vs. existing-test (a breaking-change signal)
//!
//! Both orchestrators treat the external tools as subprocesses: exit code
//! plus output scanning decide success, and a timeout kills the unit
//! without aborting its siblings.

#![warn(missing_docs)]

mod build;
mod error;
mod locate;
mod results;
mod runner;
mod subprocess;

pub use build::{compute_build_order, BuildConfig, BuildOrchestrator, BuildOutcome, BuildReport};
pub use error::VerifyError;
pub use locate::ToolLocator;
pub use results::{TestCaseResult, TestStatus};
pub use runner::{
    extract_test_units, TestExecutionSummary, TestOutcome, TestRunConfig, TestUnitPatterns,
    VerificationRunner,
};
pub use subprocess::{CommandOutput, SubprocessInvoker, ToolInvoker};
