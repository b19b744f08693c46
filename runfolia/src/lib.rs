//! Prepare and launch a Folia server for local plugin testing.
//!
//! The pipeline resolves the latest build of a release version from the
//! PaperMC build index, caches the server jar in a managed run directory,
//! stages the plugin under test (plus companion plugins) into `plugins/`, and
//! starts the server with a derived command line. The crate keeps a strict
//! split:
//!
//! - **[`core`]**: Pure logic (build selection, launch planning) and shared
//!   value types. No I/O.
//! - **[`io`]**: Side-effecting operations (HTTP, filesystem, process launch),
//!   each behind a trait where tests need to substitute it.
//!
//! [`run`] sequences the stages for the CLI commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
