//! Extraction delegators
//!
//! Table and line-item prompts bypass retrieval and prompt compilation;
//! raw document text and settings go straight to the installed plugin
//! strategy. Missing capabilities surface as licensing errors, plugin
//! failures as execution errors.

pub mod line_item;
pub mod table;

pub use line_item::extract_line_items;
pub use table::extract_table;
