use {
    crate::error::{Result, VisionError},
    candle_core::Tensor,
};

/// Color-conversion seam. The pipeline consumes this as an opaque per-group
/// call; implementations must turn any supported channel layout into
/// 3-channel RGB while leaving every other dimension alone.
pub trait RgbConvert {
    fn convert_to_rgb(&self, video: &Tensor) -> Result<Tensor>;
}

/// Default converter for videos with pixel values in the 0-255 range.
///
/// 3-channel input passes through, single-channel is repeated across three
/// channels, and 4-channel input is alpha-composited over a white
/// background. The channel dimension is third from the end.
pub struct StandardRgb;

impl RgbConvert for StandardRgb {
    fn convert_to_rgb(&self, video: &Tensor) -> Result<Tensor> {
        let dims = video.dims();
        let rank = dims.len();
        if rank < 3 {
            return Err(VisionError::Shape(format!(
                "rgb conversion expects at least (channels, height, width), got shape {:?}",
                dims
            )));
        }
        let channel_dim = rank - 3;

        match dims[channel_dim] {
            3 => Ok(video.clone()),
            1 => Ok(Tensor::cat(&[video, video, video], channel_dim)?),
            4 => {
                let rgb = video.narrow(channel_dim, 0, 3)?;
                let alpha = video
                    .narrow(channel_dim, 3, 1)?
                    .affine(1.0 / 255.0, 0.0)?;
                let blended = rgb.broadcast_mul(&alpha)?;
                // 255 * (1 - alpha), the white showing through.
                let background = alpha.affine(-255.0, 255.0)?;
                Ok(blended.broadcast_add(&background)?)
            }
            channels => Err(VisionError::Shape(format!(
                "cannot convert a {}-channel video to rgb",
                channels
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_three_channel_passthrough() {
        let video = Tensor::zeros((2, 3, 4, 4), DType::F32, &Device::Cpu).unwrap();
        let converted = StandardRgb.convert_to_rgb(&video).unwrap();
        assert_eq!(converted.dims(), &[2, 3, 4, 4]);
    }

    #[test]
    fn test_grayscale_repeats_channels() {
        let video = Tensor::full(17f32, (1, 2, 2), &Device::Cpu).unwrap();
        let converted = StandardRgb.convert_to_rgb(&video).unwrap();
        assert_eq!(converted.dims(), &[3, 2, 2]);

        let values = converted.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().all(|&v| v == 17.0));
    }

    #[test]
    fn test_alpha_composites_over_white() {
        // One pixel, rgb (100, 0, 200), alpha 127.5 (half opaque).
        let video = Tensor::from_vec(
            vec![100f32, 0.0, 200.0, 127.5],
            (4, 1, 1),
            &Device::Cpu,
        )
        .unwrap();
        let converted = StandardRgb.convert_to_rgb(&video).unwrap();
        assert_eq!(converted.dims(), &[3, 1, 1]);

        let values = converted.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let expected = [
            100.0 * 0.5 + 255.0 * 0.5,
            255.0 * 0.5,
            200.0 * 0.5 + 255.0 * 0.5,
        ];
        for (value, expected) in values.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-3, "got {:?}", values);
        }
    }

    #[test]
    fn test_rejects_unsupported_channel_count() {
        let video = Tensor::zeros((2, 4, 4), DType::F32, &Device::Cpu).unwrap();
        let result = StandardRgb.convert_to_rgb(&video);
        assert!(matches!(result, Err(VisionError::Shape(_))));
    }
}
