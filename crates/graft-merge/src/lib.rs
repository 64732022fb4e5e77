//! Graft Merge Engine
//!
//! Splices a generated method into an existing source file without touching
//! any other byte of the file. When the method cannot be found on either
//! side, the engine degrades to full-file replacement and says so; it never
//! fails silently and never fails hard.
//!
//! # Core Concepts
//!
//! - [`scanner`]: explicit finite-state scanner that matches braces while
//!   ignoring braces inside string/char literals and comments
//! - [`extract_method`]: locate a named method's full span, including its
//!   leading doc comments and attributes
//! - [`merge_method`]: verbatim splice with full-replacement fallback
//! - [`rebind_test_imports`]: point deployed test scaffolding at the real
//!   implementation namespace
//!
//! # Example
//!
//! ```rust
//! use graft_merge::{merge_method, MergePatterns};
//!
//! let existing = "class A {\n    public int Get() {\n        return 1;\n    }\n}\n";
//! let generated = "class A {\n    public int Get() {\n        return 2;\n    }\n}\n";
//! let result = merge_method(existing, generated, "Get", &MergePatterns::default());
//! assert!(!result.degraded);
//! assert!(result.content.contains("return 2;"));
//! ```

#![warn(missing_docs)]

mod engine;
mod extract;
pub mod scanner;

pub use engine::{merge_method, rebind_test_imports, MergeResult};
pub use extract::{extract_method, MergeError, MergePatterns, MethodSpan};
