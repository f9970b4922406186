//! Literal mapping syntax
//!
//! Records are written as a literal mapping with comment-delimited
//! sections. This module lexes, parses and renders that form, and reads
//! the same records from JSON.

pub mod json;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod value;

pub use json::parse_json;
pub use parser::parse;
pub use render::{render, render_value};
pub use value::{Entry, Mapping, Value};
