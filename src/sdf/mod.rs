//! Scene Description Foundations

mod path;
mod path_node;
mod path_parser;

pub use path::*;
pub use path_parser::PathParseError;
