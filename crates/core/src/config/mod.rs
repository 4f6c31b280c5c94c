//! Configuration loading and schema definitions
//!
//! One TOML file configures the image pipeline, the durable store, the
//! derived metrics and logging. Every field has a default, so an absent file
//! or an empty section is valid.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
