//! Data model: validated types, issues, relations, log records, and the
//! on-disk layout rules that the rest of the engine builds on.

pub mod layout;
pub mod types;
