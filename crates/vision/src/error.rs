use std::fmt;

pub type Result<T> = std::result::Result<T, VisionError>;

/// Errors surfaced by the preprocessing pipeline.
///
/// All variants describe caller-fixable input problems; none are transient
/// and nothing in this crate retries.
#[derive(Debug)]
pub enum VisionError {
    /// A size configuration supplied neither a longest edge nor a complete
    /// height/width pair.
    InvalidSizeSpec(String),
    /// A requested padded size is smaller than the video in some dimension.
    InvalidPadding(String),
    /// Video metadata with a non-positive frame count or duration.
    InvalidMetadata(String),
    /// A combination of processing flags that has no defined result.
    InvalidConfiguration(String),
    /// A structural violation: bad rank, bad index map, bad channel count.
    Shape(String),
    Io(String),
    Candle(String),
}

impl fmt::Display for VisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisionError::InvalidSizeSpec(msg) => write!(f, "invalid size spec: {}", msg),
            VisionError::InvalidPadding(msg) => write!(f, "invalid padding: {}", msg),
            VisionError::InvalidMetadata(msg) => write!(f, "invalid metadata: {}", msg),
            VisionError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {}", msg)
            }
            VisionError::Shape(msg) => write!(f, "shape error: {}", msg),
            VisionError::Io(msg) => write!(f, "io error: {}", msg),
            VisionError::Candle(msg) => write!(f, "tensor error: {}", msg),
        }
    }
}

impl std::error::Error for VisionError {}

impl From<candle_core::Error> for VisionError {
    fn from(error: candle_core::Error) -> Self {
        VisionError::Candle(error.to_string())
    }
}

impl From<std::io::Error> for VisionError {
    fn from(error: std::io::Error) -> Self {
        VisionError::Io(error.to_string())
    }
}
