use {
    crate::error::{Result, VisionError},
    candle_core::Tensor,
    std::collections::BTreeMap,
};

/// The full dimension tuple of a tensor, used to bucket videos so that each
/// bucket can be stacked and processed with a single vectorized op.
pub type ShapeKey = Vec<usize>;

/// Partition a batch of videos by exact shape.
///
/// Returns the stacked group per shape plus an index map recording which
/// original batch positions went into each group, in order. The index map is
/// a set partition of `0..videos.len()`: every position appears in exactly
/// one group, exactly once.
pub fn group_videos_by_shape(
    videos: &[Tensor],
) -> Result<(BTreeMap<ShapeKey, Tensor>, BTreeMap<ShapeKey, Vec<usize>>)> {
    let mut index_map: BTreeMap<ShapeKey, Vec<usize>> = BTreeMap::new();
    for (position, video) in videos.iter().enumerate() {
        index_map
            .entry(video.dims().to_vec())
            .or_default()
            .push(position);
    }

    let mut grouped = BTreeMap::new();
    for (shape, positions) in &index_map {
        let members: Vec<&Tensor> = positions.iter().map(|&p| &videos[p]).collect();
        grouped.insert(shape.clone(), Tensor::stack(&members, 0)?);
    }

    Ok((grouped, index_map))
}

/// Inverse of [`group_videos_by_shape`]: unstack every group and scatter the
/// members back to their original batch positions.
///
/// The groups may hold transformed tensors (their shapes no longer need to
/// match the keys), but `index_map` must be the one produced by the matching
/// `group_videos_by_shape` call. A missing group, a group whose length
/// disagrees with its index list, or an index that is out of range or
/// assigned twice is a [`VisionError::Shape`] error.
pub fn reorder_videos(
    grouped: &BTreeMap<ShapeKey, Tensor>,
    index_map: &BTreeMap<ShapeKey, Vec<usize>>,
) -> Result<Vec<Tensor>> {
    let batch_size: usize = index_map.values().map(Vec::len).sum();
    let mut restored: Vec<Option<Tensor>> = vec![None; batch_size];

    for (shape, positions) in index_map {
        let stacked = grouped.get(shape).ok_or_else(|| {
            VisionError::Shape(format!("no group for shape {:?} in the grouped videos", shape))
        })?;
        if stacked.dim(0)? != positions.len() {
            return Err(VisionError::Shape(format!(
                "group {:?} holds {} videos but its index list has {} entries",
                shape,
                stacked.dim(0)?,
                positions.len()
            )));
        }
        for (member, &position) in positions.iter().enumerate() {
            if position >= batch_size {
                return Err(VisionError::Shape(format!(
                    "index map position {} is out of range for a batch of {}",
                    position, batch_size
                )));
            }
            if restored[position].is_some() {
                return Err(VisionError::Shape(format!(
                    "index map assigns batch position {} more than once",
                    position
                )));
            }
            restored[position] = Some(stacked.get(member)?);
        }
    }

    restored
        .into_iter()
        .enumerate()
        .map(|(position, video)| {
            video.ok_or_else(|| {
                VisionError::Shape(format!("index map never assigns batch position {}", position))
            })
        })
        .collect()
}
