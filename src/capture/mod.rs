//! Screen capture stages.
//!
//! This module provides:
//! - The desktop abstraction (`ScreenAutomation`) and its platform backend
//! - Interactive region selection (`select_region`)
//! - The page-by-page capture loop (`capture_pages`)

pub mod backend;
pub mod region;
pub mod runner;
#[cfg(windows)]
pub mod windows;

pub use backend::{default_backend, PageKey};
pub use region::select_region;
pub use runner::{capture_pages, CaptureJob};
