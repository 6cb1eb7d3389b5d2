use {
    crate::error::{Result, VisionError},
    candle_core::{DType, Tensor},
};

/// Componentwise maximum height and width over every video in the batch.
pub fn max_height_width(videos: &[Tensor]) -> Result<(usize, usize)> {
    if videos.is_empty() {
        return Err(VisionError::Shape(
            "cannot compute a padded size for an empty batch".to_string(),
        ));
    }

    let mut max_height = 0;
    let mut max_width = 0;
    for video in videos {
        let dims = video.dims();
        if dims.len() < 2 {
            return Err(VisionError::Shape(format!(
                "expected trailing (height, width) dimensions, got shape {:?}",
                dims
            )));
        }
        max_height = max_height.max(dims[dims.len() - 2]);
        max_width = max_width.max(dims[dims.len() - 1]);
    }
    Ok((max_height, max_width))
}

/// Pad a video to `padded_size` on the bottom and right edges.
///
/// Returns the padded video and, when `return_pixel_mask` is set, an `i64`
/// mask shaped like the video minus its channel dimension: 1 over the
/// original content, 0 over the padding. A target smaller than the video in
/// either dimension is an [`VisionError::InvalidPadding`] error; a target
/// equal to the video skips the pad but still produces the mask.
pub fn pad(
    video: &Tensor,
    padded_size: (usize, usize),
    fill: f64,
    return_pixel_mask: bool,
) -> Result<(Tensor, Option<Tensor>)> {
    let dims = video.dims().to_vec();
    let rank = dims.len();
    if rank < 3 {
        return Err(VisionError::Shape(format!(
            "pad expects at least (channels, height, width), got shape {:?}",
            dims
        )));
    }
    let (height, width) = (dims[rank - 2], dims[rank - 1]);
    let (target_height, target_width) = padded_size;
    if target_height < height || target_width < width {
        return Err(VisionError::InvalidPadding(format!(
            "padded size ({}, {}) is smaller than the video size ({}, {})",
            target_height, target_width, height, width
        )));
    }

    let pad_bottom = target_height - height;
    let pad_right = target_width - width;

    let padded = if pad_bottom == 0 && pad_right == 0 {
        video.clone()
    } else if fill == 0.0 {
        video
            .pad_with_zeros(rank - 2, 0, pad_bottom)?
            .pad_with_zeros(rank - 1, 0, pad_right)?
    } else {
        let mut padded = video.clone();
        if pad_bottom > 0 {
            let mut block_dims = dims.clone();
            block_dims[rank - 2] = pad_bottom;
            let block = Tensor::full(fill as f32, block_dims, video.device())?;
            padded = Tensor::cat(&[&padded, &block], rank - 2)?;
        }
        if pad_right > 0 {
            let mut block_dims = padded.dims().to_vec();
            block_dims[rank - 1] = pad_right;
            let block = Tensor::full(fill as f32, block_dims, video.device())?;
            padded = Tensor::cat(&[&padded, &block], rank - 1)?;
        }
        padded
    };

    let pixel_mask = if return_pixel_mask {
        let mut mask_dims = dims;
        mask_dims.remove(rank - 3);
        let mask_rank = mask_dims.len();
        let ones = Tensor::ones(mask_dims, DType::I64, video.device())?;
        Some(
            ones.pad_with_zeros(mask_rank - 2, 0, pad_bottom)?
                .pad_with_zeros(mask_rank - 1, 0, pad_right)?,
        )
    } else {
        None
    };

    Ok((padded, pixel_mask))
}
