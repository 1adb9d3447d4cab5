// Library exports for reuse by the CLI and other front ends
pub mod cli;
pub mod config_file;
pub mod export;
pub mod json_output;
pub mod utils;

// Re-export commonly used types
pub use export::encode::OutputFormat;
pub use export::{
    ExportConfig, ExportEngine, ExportResult, OutputFile, OutputGroup, SkipReason,
    SkippedOutput,
};
pub use json_output::JsonMessage;
