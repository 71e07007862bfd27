//! Persistence of finished runs: CSV reports and frame stacks

pub mod report;
pub mod stack;

pub use report::ReportTable;
pub use stack::{load_stack, save_stack};
