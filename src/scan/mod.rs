//! Content classification: invisible-character sanitization, structural
//! validation, and the pattern injection scanner.

pub mod rules;
pub mod sanitize;
pub mod scanner;
pub mod structure;
