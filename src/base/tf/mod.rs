//! Tools Foundations

pub(crate) mod diagnostic;
mod token;

pub(crate) use diagnostic::{coding_error, warning};
pub use token::*;
pub(crate) use token::declare_public_tokens;
