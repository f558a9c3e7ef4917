//! Battle configuration: schema and validation from `turnward-core`, plus
//! the file loader.

pub mod loader;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use turnward_core::config::*;
