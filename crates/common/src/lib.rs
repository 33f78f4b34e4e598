//! Common types shared by the Kite workspace crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
