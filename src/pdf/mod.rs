//! PDF assembly from saved screenshots.

pub mod assemble;
pub mod document;
pub mod scan;

pub use assemble::{assemble_range, assemble_scan, AssemblyReport};
pub use document::LopdfDocument;
