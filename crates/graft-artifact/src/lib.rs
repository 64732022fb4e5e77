//! Graft Artifact System
//!
//! The unit of work graft deploys: one piece of machine-generated source
//! text, plus the metadata the generator attached to it.
//!
//! # Core Concepts
//!
//! - [`GeneratedArtifact`]: one unit of generated content slated for
//!   deployment, with modification/test flags and rebinding metadata
//! - [`ContentPatterns`]: compiled patterns for inspecting artifact text
//!   (namespace extraction), built once and injected
//!
//! # Example
//!
//! ```rust
//! use graft_artifact::{ContentPatterns, GeneratedArtifact};
//!
//! let artifact = GeneratedArtifact::new(
//!     "Acme.Billing/Invoices/InvoiceService.cs",
//!     "namespace Acme.Billing.Invoices;\n\npublic class InvoiceService { }\n",
//! )
//! .unwrap();
//!
//! let patterns = ContentPatterns::default();
//! assert_eq!(
//!     artifact.declared_namespace(&patterns).as_deref(),
//!     Some("Acme.Billing.Invoices")
//! );
//! ```

#![warn(missing_docs)]

mod artifact;
mod inspect;

pub use artifact::{ArtifactError, GeneratedArtifact};
pub use inspect::ContentPatterns;
