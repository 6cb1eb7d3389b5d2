pub mod group;
pub mod normalize;
pub mod pad;
pub mod processor;
pub mod resize;
pub mod rgb;
pub mod sampler;

pub use group::{ShapeKey, group_videos_by_shape, reorder_videos};
pub use normalize::rescale_and_normalize;
pub use pad::{max_height_width, pad};
pub use processor::{
    BatchTensors, DEFAULT_LONGEST_EDGE, SizeConfig, VideoBatch, VideoProcessor,
    VideoProcessorConfig,
};
pub use resize::{
    FilterSubstitution, FilterSupport, Interpolation, MAX_FRAME_SIDE, NativeFilters, Resizer,
    SizeSpec, resize_output_size,
};
pub use rgb::{RgbConvert, StandardRgb};
pub use sampler::{VideoMetadata, sample_frame_indices};
