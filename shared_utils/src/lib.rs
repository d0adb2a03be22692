//! Shared Utilities for heic_convert tools
//!
//! This crate provides common functionality shared by the conversion tools:
//! - Conversion error taxonomy
//! - Logging setup
//! - Worker-count policy
//! - Input collection and batch counters
//! - Progress bar and summary reporting

pub mod batch;
pub mod img_errors;
pub mod logging;
pub mod report;
pub mod thread_manager;
pub mod unified_progress;

pub use batch::{collect_files, collect_inputs, has_extension, BatchSummary, HEIC_EXTENSIONS};
pub use img_errors::{ConvertError, Result};
pub use report::{format_bytes, format_duration, print_summary_report};
pub use thread_manager::{calculate_optimal_threads, get_optimal_threads, ThreadConfig};
pub use unified_progress::UnifiedProgressBar;
