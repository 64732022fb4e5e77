//! Graft Layout System
//!
//! Where does a logical code unit physically live? This crate answers that
//! once per deployment, without touching the filesystem during resolution.
//!
//! # Overview
//!
//! - [`ModuleDescriptor`]: one buildable unit with its namespace-to-folder map
//! - [`mapper::derive_layout`]: reduce scanned (namespace, folder)
//!   observations into a root namespace and a suffix → folder map
//! - [`TargetPathResolver`]: four-tier resolution from a declared namespace
//!   to an absolute target path; always produces exactly one
//!   [`ResolvedMapping`], degrading tier by tier instead of failing
//!
//! # Example
//!
//! ```rust
//! use graft_layout::mapper::{derive_layout, NamespaceObservation};
//!
//! let layout = derive_layout(
//!     &[
//!         NamespaceObservation::new("Acme.Billing", ""),
//!         NamespaceObservation::new("Acme.Billing.Invoices", "Invoices"),
//!     ],
//!     None,
//! );
//! assert_eq!(layout.root_namespace, "Acme.Billing");
//! assert_eq!(layout.folders.get("Invoices"), Some("Invoices"));
//! ```

#![warn(missing_docs)]

pub mod mapper;
mod module;
mod resolver;

pub use module::{LayoutError, ModuleDescriptor, NamespaceFolderMap};
pub use resolver::{ResolutionConfidence, ResolvedMapping, TargetPathResolver};
