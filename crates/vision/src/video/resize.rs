use {
    crate::error::{Result, VisionError},
    candle_core::{DType, Device, Tensor},
    serde::{Deserialize, Serialize},
    std::{collections::HashSet, fmt},
};

/// Hard ceiling on either output dimension (4k).
pub const MAX_FRAME_SIDE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Nearest => write!(f, "nearest"),
            Interpolation::Bilinear => write!(f, "bilinear"),
            Interpolation::Bicubic => write!(f, "bicubic"),
            Interpolation::Lanczos => write!(f, "lanczos"),
        }
    }
}

/// Target sizing policy for a resize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    /// Resize so the longer edge hits the given value, preserving aspect
    /// ratio, with the derived edge rounded up to an even number.
    LongestEdge(usize),
    /// Resize to this exact size, no aspect adjustment.
    Exact { height: usize, width: usize },
}

/// Capability query for the resize backend, injected at construction.
pub trait FilterSupport: Send + Sync {
    /// The filter the backend will actually run for `requested`.
    fn resolve(&self, requested: Interpolation) -> Interpolation;
}

/// Filters implemented natively on candle tensors: nearest and bilinear.
/// Bicubic and lanczos fall back to bilinear.
pub struct NativeFilters;

impl FilterSupport for NativeFilters {
    fn resolve(&self, requested: Interpolation) -> Interpolation {
        match requested {
            Interpolation::Nearest => Interpolation::Nearest,
            Interpolation::Bilinear
            | Interpolation::Bicubic
            | Interpolation::Lanczos => Interpolation::Bilinear,
        }
    }
}

/// Record of a filter the backend could not honor and what ran instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSubstitution {
    pub requested: Interpolation,
    pub used: Interpolation,
}

/// Resizes videos under a sizing policy, substituting unsupported
/// interpolation filters.
///
/// Each substituted filter is logged once per resizer instance and recorded
/// as a [`FilterSubstitution`] event; processing continues with the fallback.
pub struct Resizer {
    support: Box<dyn FilterSupport>,
    warned: HashSet<Interpolation>,
    substitutions: Vec<FilterSubstitution>,
}

impl Resizer {
    pub fn new(support: Box<dyn FilterSupport>) -> Self {
        Self {
            support,
            warned: HashSet::new(),
            substitutions: Vec::new(),
        }
    }

    /// A resizer backed by the native candle kernels.
    pub fn native() -> Self {
        Self::new(Box::new(NativeFilters))
    }

    /// Filter substitutions seen so far, one per distinct requested filter.
    pub fn substitutions(&self) -> &[FilterSubstitution] {
        &self.substitutions
    }

    pub fn take_substitutions(&mut self) -> Vec<FilterSubstitution> {
        std::mem::take(&mut self.substitutions)
    }

    /// Resize `video` to the size given by `size`.
    ///
    /// Leading dimensions are unchanged; the trailing two become the target
    /// height and width. Pixel data is promoted to `f32`.
    pub fn resize(
        &mut self,
        video: &Tensor,
        size: SizeSpec,
        interpolation: Interpolation,
        antialias: bool,
    ) -> Result<Tensor> {
        let filter = self.support.resolve(interpolation);
        if filter != interpolation && self.warned.insert(interpolation) {
            base::log_warn!(
                "{} interpolation is not supported by the tensor backend, using {} instead",
                interpolation,
                filter
            );
            self.substitutions.push(FilterSubstitution {
                requested: interpolation,
                used: filter,
            });
        }

        let (out_height, out_width) = output_size(video, size)?;
        match filter {
            Interpolation::Nearest => resize_nearest(video, out_height, out_width),
            Interpolation::Bilinear => resize_bilinear(video, out_height, out_width, antialias),
            Interpolation::Bicubic | Interpolation::Lanczos => {
                Err(VisionError::InvalidConfiguration(format!(
                    "no native kernel for {} interpolation",
                    filter
                )))
            }
        }
    }
}

/// Output size when rescaling the longest edge to `longest_edge` while
/// preserving the input aspect ratio.
///
/// The target is clamped to [`MAX_FRAME_SIDE`]; the derived edge is rounded
/// down and bumped to the next even number if odd (patch-based encoders
/// require even dimensions); both edges are floored to 1.
pub fn resize_output_size(height: usize, width: usize, longest_edge: usize) -> (usize, usize) {
    let max_side = longest_edge.min(MAX_FRAME_SIDE);
    let aspect_ratio = width as f64 / height as f64;

    let (mut new_height, mut new_width);
    if width >= height {
        new_width = max_side;
        new_height = (new_width as f64 / aspect_ratio) as usize;
        if new_height % 2 != 0 {
            new_height += 1;
        }
    } else {
        new_height = max_side;
        new_width = (new_height as f64 * aspect_ratio) as usize;
        if new_width % 2 != 0 {
            new_width += 1;
        }
    }

    (new_height.max(1), new_width.max(1))
}

fn output_size(video: &Tensor, size: SizeSpec) -> Result<(usize, usize)> {
    let dims = video.dims();
    if dims.len() < 2 {
        return Err(VisionError::Shape(format!(
            "resize expects trailing (height, width) dimensions, got shape {:?}",
            dims
        )));
    }
    let (height, width) = (dims[dims.len() - 2], dims[dims.len() - 1]);
    if height == 0 || width == 0 {
        return Err(VisionError::Shape(format!(
            "video dimensions must be non-zero, got {}x{}",
            height, width
        )));
    }

    match size {
        SizeSpec::LongestEdge(longest_edge) => Ok(resize_output_size(height, width, longest_edge)),
        SizeSpec::Exact { height, width } => {
            if height == 0 || width == 0 {
                return Err(VisionError::InvalidSizeSpec(format!(
                    "exact size must be non-zero, got {}x{}",
                    height, width
                )));
            }
            Ok((height, width))
        }
    }
}

/// Nearest-neighbor resize over arbitrary leading dimensions.
///
/// Collapses everything but the trailing (height, width) into a single batch
/// axis so the 4D nearest kernel applies, then restores the original leading
/// shape.
fn resize_nearest(video: &Tensor, out_height: usize, out_width: usize) -> Result<Tensor> {
    let video = video.to_dtype(DType::F32)?;
    let dims = video.dims().to_vec();
    let rank = dims.len();
    let (height, width) = (dims[rank - 2], dims[rank - 1]);
    if (height, width) == (out_height, out_width) {
        return Ok(video);
    }

    let lead: usize = dims[..rank - 2].iter().product();
    let flat = video.reshape((lead, 1, height, width))?;
    let resized = flat.upsample_nearest2d(out_height, out_width)?;

    let mut out_dims = dims;
    out_dims[rank - 2] = out_height;
    out_dims[rank - 1] = out_width;
    Ok(resized.reshape(out_dims)?)
}

/// Bilinear resize as two separable interpolation matmuls:
/// `Wh · X · Wwᵀ` with `Wh: (out_h, h)` and `Ww: (out_w, w)`.
fn resize_bilinear(
    video: &Tensor,
    out_height: usize,
    out_width: usize,
    antialias: bool,
) -> Result<Tensor> {
    let video = video.to_dtype(DType::F32)?;
    let dims = video.dims();
    let rank = dims.len();
    let (height, width) = (dims[rank - 2], dims[rank - 1]);
    if (height, width) == (out_height, out_width) {
        return Ok(video);
    }

    let device = video.device();
    let weights_h = interp_weights(height, out_height, antialias, device)?;
    let weights_w = interp_weights(width, out_width, antialias, device)?;

    let resized = weights_h.broadcast_matmul(&video)?;
    Ok(resized.broadcast_matmul(&weights_w.t()?)?)
}

/// Row-normalized triangle-filter weights mapping `in_len` samples to
/// `out_len`, using half-pixel sample centers. With `antialias` the filter
/// support widens by the scale factor when downscaling, so every source
/// pixel under an output pixel contributes.
fn interp_weights(
    in_len: usize,
    out_len: usize,
    antialias: bool,
    device: &Device,
) -> Result<Tensor> {
    let scale = in_len as f64 / out_len as f64;
    let support = if antialias && scale > 1.0 { scale } else { 1.0 };

    let mut weights = vec![0f32; out_len * in_len];
    for i in 0..out_len {
        let center = (i as f64 + 0.5) * scale;
        let lo = (center - support).floor().max(0.0) as usize;
        let hi = ((center + support).ceil() as usize).min(in_len);
        let row = &mut weights[i * in_len..(i + 1) * in_len];

        let mut sum = 0f64;
        for j in lo..hi {
            let distance = ((j as f64 + 0.5) - center).abs() / support;
            let value = (1.0 - distance).max(0.0);
            row[j] = value as f32;
            sum += value;
        }
        if sum > 0.0 {
            let inverse = (1.0 / sum) as f32;
            for j in lo..hi {
                row[j] *= inverse;
            }
        } else {
            // Degenerate window, take the nearest source pixel.
            row[(center as usize).min(in_len - 1)] = 1.0;
        }
    }

    Ok(Tensor::from_vec(weights, (out_len, in_len), device)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size_preserves_aspect_and_parity() {
        // Landscape: width becomes the target, height is derived and evened.
        assert_eq!(resize_output_size(200, 300, 100), (66, 100));
        // 100 * 3/4 = 75, odd, bumped to 76.
        assert_eq!(resize_output_size(3, 4, 100), (76, 100));
        // Portrait: height becomes the target.
        assert_eq!(resize_output_size(100, 80, 128), (128, 102));
        // Square.
        assert_eq!(resize_output_size(64, 64, 128), (128, 128));
    }

    #[test]
    fn test_output_size_clamps_to_max_side() {
        assert_eq!(resize_output_size(100, 200, 5000), (2048, 4096));
    }

    #[test]
    fn test_output_size_floors_at_one() {
        // Extreme aspect ratio collapses the derived edge to zero before the floor.
        assert_eq!(resize_output_size(1, 1000, 64), (1, 64));
    }

    #[test]
    fn test_output_size_aspect_error_is_bounded() {
        // The derived edge may be off by one pixel of rounding plus one of
        // parity correction.
        for (height, width) in [(480, 640), (299, 701), (64, 64), (1080, 1920)] {
            let (out_h, out_w) = resize_output_size(height, width, 1456);
            let in_aspect = width as f64 / height as f64;
            let out_aspect = out_w as f64 / out_h as f64;
            let tolerance = in_aspect * 2.0 / out_h.min(out_w) as f64;
            assert!(
                (out_aspect - in_aspect).abs() <= tolerance,
                "{}x{} -> {}x{} drifts too far from aspect {}",
                height,
                width,
                out_h,
                out_w,
                in_aspect
            );
        }
    }

    #[test]
    fn test_exact_mode_ignores_aspect() {
        let video = Tensor::zeros((2, 3, 10, 20), DType::F32, &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        let resized = resizer
            .resize(
                &video,
                SizeSpec::Exact {
                    height: 50,
                    width: 60,
                },
                Interpolation::Nearest,
                true,
            )
            .unwrap();
        assert_eq!(resized.dims(), &[2, 3, 50, 60]);
    }

    #[test]
    fn test_exact_mode_rejects_zero() {
        let video = Tensor::zeros((3, 10, 20), DType::F32, &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        let result = resizer.resize(
            &video,
            SizeSpec::Exact {
                height: 0,
                width: 60,
            },
            Interpolation::Nearest,
            true,
        );
        assert!(matches!(result, Err(VisionError::InvalidSizeSpec(_))));
    }

    #[test]
    fn test_nearest_upscale_values() {
        let video =
            Tensor::from_vec(vec![1f32, 2.0, 3.0, 4.0], (1, 1, 2, 2), &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        let resized = resizer
            .resize(
                &video,
                SizeSpec::Exact {
                    height: 4,
                    width: 4,
                },
                Interpolation::Nearest,
                false,
            )
            .unwrap();
        assert_eq!(resized.dims(), &[1, 1, 4, 4]);

        let rows = resized
            .reshape((4, 4))
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(rows[0], vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(rows[3], vec![3.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_bilinear_upscale_values() {
        let video = Tensor::from_vec(vec![0f32, 2.0], (1, 1, 1, 2), &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        let resized = resizer
            .resize(
                &video,
                SizeSpec::Exact {
                    height: 1,
                    width: 4,
                },
                Interpolation::Bilinear,
                false,
            )
            .unwrap();

        let values = resized.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let expected = [0.0, 0.5, 1.5, 2.0];
        for (value, expected) in values.iter().zip(expected) {
            assert!(
                (value - expected).abs() < 1e-5,
                "got {:?}, expected {:?}",
                values,
                expected
            );
        }
    }

    #[test]
    fn test_bilinear_antialias_downscale_values() {
        let video =
            Tensor::from_vec(vec![0f32, 2.0, 4.0, 6.0], (1, 1, 1, 4), &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        let resized = resizer
            .resize(
                &video,
                SizeSpec::Exact {
                    height: 1,
                    width: 2,
                },
                Interpolation::Bilinear,
                true,
            )
            .unwrap();

        let values = resized.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        // Triangle filter with support 2: weights (.75, .75, .25) / 1.75 and
        // the mirror image.
        assert!((values[0] - 2.5 / 1.75).abs() < 1e-4, "got {:?}", values);
        assert!((values[1] - 8.0 / 1.75).abs() < 1e-4, "got {:?}", values);
    }

    #[test]
    fn test_bilinear_preserves_constant_input() {
        let video = Tensor::full(5f32, (2, 3, 8, 6), &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        for antialias in [false, true] {
            let resized = resizer
                .resize(
                    &video,
                    SizeSpec::Exact {
                        height: 3,
                        width: 10,
                    },
                    Interpolation::Bilinear,
                    antialias,
                )
                .unwrap();
            assert_eq!(resized.dims(), &[2, 3, 3, 10]);
            let values = resized.flatten_all().unwrap().to_vec1::<f32>().unwrap();
            for value in values {
                assert!((value - 5.0).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_unsupported_filter_substitutes_and_warns_once() {
        let video = Tensor::zeros((3, 8, 8), DType::F32, &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        let size = SizeSpec::LongestEdge(16);

        resizer
            .resize(&video, size, Interpolation::Lanczos, true)
            .unwrap();
        resizer
            .resize(&video, size, Interpolation::Lanczos, true)
            .unwrap();
        assert_eq!(resizer.substitutions().len(), 1);
        assert_eq!(
            resizer.substitutions()[0],
            FilterSubstitution {
                requested: Interpolation::Lanczos,
                used: Interpolation::Bilinear,
            }
        );

        resizer
            .resize(&video, size, Interpolation::Bicubic, true)
            .unwrap();
        assert_eq!(resizer.substitutions().len(), 2);

        let drained = resizer.take_substitutions();
        assert_eq!(drained.len(), 2);
        assert!(resizer.substitutions().is_empty());
    }

    #[test]
    fn test_longest_edge_resize_shape() {
        let video = Tensor::zeros((2, 3, 32, 96), DType::F32, &Device::Cpu).unwrap();
        let mut resizer = Resizer::native();
        let resized = resizer
            .resize(
                &video,
                SizeSpec::LongestEdge(128),
                Interpolation::Bilinear,
                true,
            )
            .unwrap();
        // 128 / 3 = 42.67 floored to 42, already even.
        assert_eq!(resized.dims(), &[2, 3, 42, 128]);
    }
}
