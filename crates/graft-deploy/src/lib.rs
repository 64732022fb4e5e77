//! Graft Deployment Engine
//!
//! Applies resolved artifacts to the codebase: method-level merges for
//! modifications, plain writes for new files, manifest amendments for the
//! build tool, and a forward log detailed enough to undo it all.
//!
//! Not a true transaction: there is no atomic multi-file commit. The engine
//! keeps a best-effort forward log ([`DeploymentRecord`]) and offers a
//! best-effort reverse operation ([`rollback`]). Rollback is never invoked
//! automatically; the caller decides, typically after verification fails.
//!
//! # Overview
//!
//! - [`DeploymentEngine`]: resolve → merge → write → amend manifests
//! - [`DeploymentRecord`]: append-only per-file / per-manifest outcome log
//! - [`rollback`]: delete created files, prune emptied directories, remove
//!   added manifest entries
//! - [`CancelToken`]: cooperative cancellation checked before each unit of
//!   work; committed steps stay committed

#![warn(missing_docs)]

mod cancel;
mod engine;
pub mod manifest;
mod record;
mod rollback;

pub use cancel::CancelToken;
pub use engine::{DeployConfig, DeployError, DeploymentEngine};
pub use record::{DeploymentRecord, FileCopyOutcome, ManifestUpdateOutcome, RollbackRecord};
pub use rollback::rollback;
