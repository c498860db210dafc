//! # catsync output projection
//!
//! Turns the flattened record stream into typed catalog entry models, one
//! output at a time: [`Projector::collect`] applies the output's source
//! filter, [`Projector::marshal_entries`] evaluates the entry expressions
//! and binds attribute values, and [`marshal_type`] derives the desired
//! type shape for the type reconciler.

mod error;
mod model;
mod project;

pub use error::ProjectionError;
pub use model::{DesiredType, EntryModel};
pub use project::{marshal_type, Projector};
