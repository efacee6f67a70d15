//! Domain operations of the recipe-sharing service.
//!
//! Everything here works on a sea-orm connection and the configured
//! [`Settings`]; the HTTP layer only maps requests onto these calls.

pub mod error;
pub mod recipe_query;
pub mod recipe_writer;
pub mod relations;
pub mod settings;
pub mod shopping_list;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{ComputeError, Result};
pub use settings::{IngredientMergeMode, Settings};
