use {
    crate::error::{Result, VisionError},
    candle_core::{Device, Tensor},
};

/// Rescale pixel values by a constant factor, then normalize with
/// per-channel mean and standard deviation.
///
/// Either step can be toggled independently; when both run, rescale comes
/// first. `mean` and `std` may hold one value per channel or a single value
/// broadcast across all channels. The output shape equals the input shape.
pub fn rescale_and_normalize(
    video: &Tensor,
    do_rescale: bool,
    rescale_factor: f64,
    do_normalize: bool,
    mean: &[f64],
    std: &[f64],
) -> Result<Tensor> {
    let mut video = video.clone();

    if do_rescale {
        video = video.affine(rescale_factor, 0.0)?;
    }

    if do_normalize {
        let dims = video.dims();
        if dims.len() < 3 {
            return Err(VisionError::Shape(format!(
                "normalize expects at least (channels, height, width), got shape {:?}",
                dims
            )));
        }
        let channels = dims[dims.len() - 3];
        let mean = channel_stats(mean, channels, video.device())?;
        let std = channel_stats(std, channels, video.device())?;
        video = video.broadcast_sub(&mean)?.broadcast_div(&std)?;
    }

    Ok(video)
}

/// Shape channel statistics as `(channels, 1, 1)` so they broadcast over
/// the trailing spatial dimensions.
fn channel_stats(values: &[f64], channels: usize, device: &Device) -> Result<Tensor> {
    let expanded: Vec<f32> = match values.len() {
        1 => vec![values[0] as f32; channels],
        n if n == channels => values.iter().map(|&v| v as f32).collect(),
        n => {
            return Err(VisionError::Shape(format!(
                "expected 1 or {} channel statistics, got {}",
                channels, n
            )));
        }
    };
    Ok(Tensor::from_vec(expanded, (channels, 1, 1), device)?)
}
