use {
    super::{
        group::{ShapeKey, group_videos_by_shape, reorder_videos},
        normalize::rescale_and_normalize,
        pad::{max_height_width, pad},
        resize::{FilterSubstitution, Interpolation, Resizer, SizeSpec},
        rgb::{RgbConvert, StandardRgb},
    },
    crate::error::{Result, VisionError},
    candle_core::{DType, Tensor},
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, fs, path::Path},
};

/// Default longest edge: four 364-pixel patches.
pub const DEFAULT_LONGEST_EDGE: usize = 4 * 364;

/// Raw sizing configuration. Exactly one form must be supplied: a longest
/// edge, or both height and width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizeConfig {
    pub longest_edge: Option<usize>,
    pub height: Option<usize>,
    pub width: Option<usize>,
}

impl SizeConfig {
    pub fn longest_edge(edge: usize) -> Self {
        Self {
            longest_edge: Some(edge),
            ..Self::default()
        }
    }

    pub fn exact(height: usize, width: usize) -> Self {
        Self {
            height: Some(height),
            width: Some(width),
            ..Self::default()
        }
    }

    pub fn to_spec(&self) -> Result<SizeSpec> {
        if let Some(edge) = self.longest_edge {
            Ok(SizeSpec::LongestEdge(edge))
        } else if let (Some(height), Some(width)) = (self.height, self.width) {
            Ok(SizeSpec::Exact { height, width })
        } else {
            Err(VisionError::InvalidSizeSpec(format!(
                "size must specify longest_edge or both height and width, got {:?}",
                self
            )))
        }
    }
}

/// Immutable configuration for one pipeline invocation.
///
/// Loadable from a processor JSON file; missing fields take the defaults
/// below, unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoProcessorConfig {
    pub do_convert_rgb: bool,
    pub do_resize: bool,
    pub size: SizeConfig,
    pub interpolation: Interpolation,
    pub antialias: bool,
    pub do_rescale: bool,
    pub rescale_factor: f64,
    pub do_normalize: bool,
    pub image_mean: Vec<f64>,
    pub image_std: Vec<f64>,
    pub do_pad: bool,
    pub pad_fill: f64,
    pub return_stacked: bool,
}

impl Default for VideoProcessorConfig {
    fn default() -> Self {
        Self {
            do_convert_rgb: true,
            do_resize: true,
            size: SizeConfig::longest_edge(DEFAULT_LONGEST_EDGE),
            interpolation: Interpolation::Lanczos,
            antialias: true,
            do_rescale: true,
            rescale_factor: 1.0 / 255.0,
            do_normalize: true,
            image_mean: vec![0.5, 0.5, 0.5],
            image_std: vec![0.5, 0.5, 0.5],
            do_pad: true,
            pad_fill: 0.0,
            return_stacked: true,
        }
    }
}

impl VideoProcessorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| VisionError::InvalidConfiguration(format!("bad processor config: {}", e)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// The batch output: one stacked tensor, or one tensor per video.
#[derive(Debug, Clone)]
pub enum BatchTensors {
    Stacked(Tensor),
    List(Vec<Tensor>),
}

impl BatchTensors {
    pub fn as_stacked(&self) -> Option<&Tensor> {
        match self {
            BatchTensors::Stacked(tensor) => Some(tensor),
            BatchTensors::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tensor]> {
        match self {
            BatchTensors::Stacked(_) => None,
            BatchTensors::List(videos) => Some(videos),
        }
    }
}

/// Preprocessed batch handed to the model: pixel values plus, when padding
/// ran, the pixel-validity mask.
#[derive(Debug, Clone)]
pub struct VideoBatch {
    pub pixel_values: BatchTensors,
    pub pixel_attention_mask: Option<BatchTensors>,
}

/// Batched video preprocessor.
///
/// Videos of arbitrary, possibly differing sizes are grouped by shape so
/// each stage runs vectorized per group: convert to rgb, resize, rescale and
/// normalize, then pad everything to the batch-wide maximum size with a
/// validity mask, and reassemble in original batch order.
pub struct VideoProcessor {
    config: VideoProcessorConfig,
    resizer: Resizer,
    rgb: Box<dyn RgbConvert>,
}

impl VideoProcessor {
    pub fn new(config: VideoProcessorConfig) -> Self {
        Self {
            config,
            resizer: Resizer::native(),
            rgb: Box::new(StandardRgb),
        }
    }

    /// Replace the color-conversion collaborator.
    pub fn with_rgb_converter(mut self, rgb: Box<dyn RgbConvert>) -> Self {
        self.rgb = rgb;
        self
    }

    /// Replace the resizer, e.g. to inject a different capability query.
    pub fn with_resizer(mut self, resizer: Resizer) -> Self {
        self.resizer = resizer;
        self
    }

    pub fn config(&self) -> &VideoProcessorConfig {
        &self.config
    }

    /// Interpolation filters that were substituted so far, one event per
    /// distinct requested filter.
    pub fn filter_substitutions(&self) -> &[FilterSubstitution] {
        self.resizer.substitutions()
    }

    /// Run the full pipeline over a batch of videos with trailing
    /// (height, width) dimensions and a channel dimension third from the
    /// end, e.g. `(T, C, H, W)`.
    pub fn preprocess(&mut self, videos: &[Tensor]) -> Result<VideoBatch> {
        if videos.is_empty() {
            return Err(VisionError::Shape(
                "preprocess requires at least one video".to_string(),
            ));
        }
        let size = if self.config.do_resize {
            Some(self.config.size.to_spec()?)
        } else {
            None
        };

        let videos: Vec<Tensor> = videos
            .iter()
            .map(|v| v.to_dtype(DType::F32))
            .collect::<candle_core::Result<_>>()?;

        // Convert to rgb and resize, vectorized per shape group.
        let (grouped, index_map) = group_videos_by_shape(&videos)?;
        let mut resized: BTreeMap<ShapeKey, Tensor> = BTreeMap::new();
        for (shape, stacked) in &grouped {
            let mut stacked = stacked.clone();
            if self.config.do_convert_rgb {
                stacked = self.rgb.convert_to_rgb(&stacked)?;
            }
            if let Some(size) = size {
                stacked = self.resizer.resize(
                    &stacked,
                    size,
                    self.config.interpolation,
                    self.config.antialias,
                )?;
            }
            resized.insert(shape.clone(), stacked);
        }
        let videos = reorder_videos(&resized, &index_map)?;

        // Rescale and normalize; shapes changed, so re-partition.
        let (grouped, index_map) = group_videos_by_shape(&videos)?;
        let mut normalized: BTreeMap<ShapeKey, Tensor> = BTreeMap::new();
        for (shape, stacked) in &grouped {
            normalized.insert(
                shape.clone(),
                rescale_and_normalize(
                    stacked,
                    self.config.do_rescale,
                    self.config.rescale_factor,
                    self.config.do_normalize,
                    &self.config.image_mean,
                    &self.config.image_std,
                )?,
            );
        }
        let mut videos = reorder_videos(&normalized, &index_map)?;

        // Pad every video to the single batch-wide maximum size.
        let mut masks = None;
        if self.config.do_pad {
            let padded_size = max_height_width(&videos)?;
            let (grouped, index_map) = group_videos_by_shape(&videos)?;
            let mut padded_groups: BTreeMap<ShapeKey, Tensor> = BTreeMap::new();
            let mut mask_groups: BTreeMap<ShapeKey, Tensor> = BTreeMap::new();
            for (shape, stacked) in &grouped {
                let (padded, mask) = pad(stacked, padded_size, self.config.pad_fill, true)?;
                let mask = mask.ok_or_else(|| {
                    VisionError::Shape("pixel mask missing after padding".to_string())
                })?;
                padded_groups.insert(shape.clone(), padded);
                mask_groups.insert(shape.clone(), mask);
            }
            videos = reorder_videos(&padded_groups, &index_map)?;
            masks = Some(reorder_videos(&mask_groups, &index_map)?);
        }

        let pixel_values = self.assemble(videos)?;
        let pixel_attention_mask = match masks {
            Some(masks) => Some(self.assemble(masks)?),
            None => None,
        };
        Ok(VideoBatch {
            pixel_values,
            pixel_attention_mask,
        })
    }

    fn assemble(&self, videos: Vec<Tensor>) -> Result<BatchTensors> {
        if !self.config.return_stacked {
            return Ok(BatchTensors::List(videos));
        }
        let first = videos[0].dims().to_vec();
        if videos.iter().any(|v| v.dims() != first.as_slice()) {
            return Err(VisionError::InvalidConfiguration(
                "cannot stack videos with differing shapes; enable do_pad or request a list"
                    .to_string(),
            ));
        }
        Ok(BatchTensors::Stacked(Tensor::stack(&videos, 0)?))
    }
}
