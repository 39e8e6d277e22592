// Library exports for reuse by the CLI, the GUI and other applications
pub mod cli;
pub mod codec;
pub mod config_file;
pub mod conversion;
pub mod json_output;
pub mod utils;

// Re-export commonly used types
pub use cli::{OutputFormat, DEFAULT_JPG_QUALITY};
pub use codec::{encode_image, Codec, HeifCodec};
pub use config_file::SettingsFile;
pub use conversion::{
    convert, discover_files, plan_requests, BatchError, BatchRunner, BatchState, BatchSummary,
    CancelToken, ConversionConfig, ConversionError, ConversionRequest, ConversionResult, Outcome,
};
pub use json_output::JsonMessage;
