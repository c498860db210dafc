//! # catsync expressions
//!
//! A small, pure expression layer over parsed records. Filters and attribute
//! projections in the importer configuration are written in this language;
//! the engine underneath is a sandboxed Rhai instance, isolated behind a
//! `compile` / `eval` seam so the concrete language could be swapped without
//! touching the projector.
//!
//! Record fields are in scope as plain variables, and the whole record is
//! additionally available as `record` for keys that are not valid
//! identifiers:
//!
//! ```
//! use catsync_expr::Evaluator;
//!
//! let evaluator = Evaluator::new();
//! let program = evaluator.compile(r#"name + " (" + team + ")""#).unwrap();
//!
//! let record = serde_json::json!({"name": "payments", "team": "core"});
//! let record = record.as_object().unwrap();
//! let value = evaluator
//!     .eval_string(&program, record, "example.json")
//!     .unwrap();
//! assert_eq!(value, "payments (core)");
//! ```

mod error;
mod evaluator;

pub use error::ExprError;
pub use evaluator::{Evaluator, Program};
