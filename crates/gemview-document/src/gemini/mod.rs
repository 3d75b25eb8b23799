//! text/gemini support.

pub mod parser;

pub use parser::{GeminiDocument, GeminiLine};
