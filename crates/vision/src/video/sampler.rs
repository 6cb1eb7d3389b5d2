use {
    crate::error::{Result, VisionError},
    serde::{Deserialize, Serialize},
};

/// Properties of a source video as reported by the upstream decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub total_num_frames: usize,
    pub fps: f64,
    pub duration: f64,
}

/// Select the frame indices to extract from a long video.
///
/// Aims for `target_fps` sampled frames per second of video, capped at
/// `max_frames`. With `skip_secs > 0` and a long enough video, that many
/// seconds are trimmed from both ends of the sampling window before the
/// indices are spread evenly across it.
///
/// Returns strictly ascending indices in `[0, total_num_frames - 1]`; the
/// count may fall below the target after deduplication of rounded indices.
pub fn sample_frame_indices(
    metadata: &VideoMetadata,
    max_frames: usize,
    target_fps: f64,
    skip_secs: f64,
) -> Result<Vec<usize>> {
    if metadata.total_num_frames == 0 {
        return Err(VisionError::InvalidMetadata(format!(
            "total_num_frames must be positive, got {}",
            metadata.total_num_frames
        )));
    }
    if metadata.duration <= 0.0 {
        return Err(VisionError::InvalidMetadata(format!(
            "duration must be positive, got {}",
            metadata.duration
        )));
    }

    let total = metadata.total_num_frames as i64;
    let estimated_frames = (target_fps * metadata.duration).round() as i64;
    let desired_frames = estimated_frames.min(max_frames as i64).max(1);

    let mut start_idx: i64 = 0;
    let mut end_idx: i64 = total - 1;
    // Trim only when the video is long enough that skipping both ends still
    // leaves a usable window.
    if skip_secs > 0.0
        && (metadata.duration - 2.0 * skip_secs) > (max_frames as f64 * target_fps)
    {
        start_idx = (skip_secs * metadata.fps) as i64;
        end_idx = (total as f64 - skip_secs * metadata.fps) as i64;
    }

    start_idx = start_idx.max(0);
    end_idx = end_idx.min(total - 1);
    if start_idx >= end_idx {
        start_idx = 0;
        end_idx = total - 1;
    }

    let mut indices = Vec::with_capacity(desired_frames as usize);
    if desired_frames == 1 {
        indices.push(start_idx as usize);
    } else {
        let step = (end_idx - start_idx) as f64 / (desired_frames - 1) as f64;
        for k in 0..desired_frames {
            let index = (start_idx as f64 + k as f64 * step).round() as i64;
            let index = index.clamp(0, total - 1) as usize;
            if indices.last() != Some(&index) {
                indices.push(index);
            }
        }
    }

    Ok(indices)
}
