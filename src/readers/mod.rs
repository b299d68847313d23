//! Source readers convert raw document bytes into text suitable for the
//! classifier. Every reader returns `None` on any extraction failure; the
//! orchestrator treats `None` as "try the next method in the ladder".

pub mod spreadsheet;
pub mod tables;
pub mod text;

pub use spreadsheet::*;
pub use tables::*;
pub use text::*;
