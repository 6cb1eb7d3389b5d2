pub mod error;
pub mod video;

pub use error::{Result, VisionError};
pub use video::{VideoBatch, VideoProcessor, VideoProcessorConfig};
