use ndarray::{Array2, ArrayView2};

use crate::error::{MotionError, Result};

/// Assignment of frames to median-input groups.
///
/// Group `g` covers frames `g * rebin .. (g + 1) * rebin`. Empty frames keep
/// their slot in the group but contribute no weight, so a group is the mean of
/// its non-empty members only.
#[derive(Clone, Debug)]
pub struct RebinLayout {
    rebin: usize,
    frame_count: usize,
    members: Vec<usize>,
}

impl RebinLayout {
    pub fn new(frame_count: usize, rebin: usize, empty: &[bool]) -> Result<Self> {
        if rebin == 0 {
            return Err(MotionError::InvalidConfig(
                "median_rebin must be at least 1".into(),
            ));
        }
        if empty.len() != frame_count {
            return Err(MotionError::InvalidConfig(format!(
                "{} empty flags for {} frames",
                empty.len(),
                frame_count
            )));
        }

        let group_count = frame_count.div_ceil(rebin);
        let mut members = vec![0usize; group_count];
        for (frame, _) in empty.iter().enumerate().filter(|(_, &e)| !e) {
            members[frame / rebin] += 1;
        }

        Ok(Self {
            rebin,
            frame_count,
            members,
        })
    }

    pub fn rebin(&self) -> usize {
        self.rebin
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn group_count(&self) -> usize {
        self.members.len()
    }

    pub fn group_of(&self, frame: usize) -> Result<usize> {
        let group = frame / self.rebin;
        if group >= self.group_count() {
            return Err(MotionError::RebinOverflow {
                index: group,
                count: self.group_count(),
            });
        }
        Ok(group)
    }

    /// Number of non-empty frames in `group`.
    pub fn members(&self, group: usize) -> usize {
        self.members[group]
    }

    /// Averaging weight of `group`, `None` when every member is empty.
    pub fn weight(&self, group: usize) -> Option<f32> {
        match self.members[group] {
            0 => None,
            n => Some(1.0 / n as f32),
        }
    }
}

/// One mean image per rebin group; the samples fed to the reference median.
#[derive(Clone, Debug)]
pub struct RebinGroups {
    images: Vec<Array2<f32>>,
}

impl RebinGroups {
    /// Sum the given frames into their groups, then normalise each group by
    /// its member count. Groups that received nothing are NaN-filled.
    ///
    /// `frames` yields `(frame_index, image)` for non-empty frames; within a
    /// group the first member is copied and later members are added, in the
    /// order supplied.
    pub fn fold<'a, I>(layout: &RebinLayout, dim: (usize, usize), frames: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, ArrayView2<'a, f32>)>,
    {
        let mut sums: Vec<Option<Array2<f32>>> = vec![None; layout.group_count()];

        for (frame, image) in frames {
            if image.dim() != dim {
                return Err(MotionError::DimensionMismatch {
                    expected_rows: dim.0,
                    expected_cols: dim.1,
                    rows: image.nrows(),
                    cols: image.ncols(),
                });
            }
            let group = layout.group_of(frame)?;
            let slot = &mut sums[group];
            match slot {
                Some(sum) => *sum += &image,
                None => *slot = Some(image.to_owned()),
            }
        }

        let images = sums
            .into_iter()
            .enumerate()
            .map(|(group, sum)| match (sum, layout.weight(group)) {
                (Some(sum), Some(weight)) => sum * weight,
                _ => Array2::from_elem(dim, f32::NAN),
            })
            .collect();

        Ok(Self { images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[Array2<f32>] {
        &self.images
    }

    pub fn views(&self) -> Vec<ArrayView2<'_, f32>> {
        self.images.iter().map(|image| image.view()).collect()
    }

    pub fn into_images(self) -> Vec<Array2<f32>> {
        self.images
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_counts_members() {
        let empty = [false, true, false, false, true];
        let layout = RebinLayout::new(5, 2, &empty).unwrap();
        assert_eq!(layout.group_count(), 3);
        assert_eq!(layout.members(0), 1);
        assert_eq!(layout.members(1), 2);
        assert_eq!(layout.members(2), 0);
        assert_eq!(layout.weight(2), None);
        assert_eq!(layout.weight(1), Some(0.5));
    }

    #[test]
    fn test_zero_rebin_rejected() {
        assert!(RebinLayout::new(3, 0, &[false; 3]).is_err());
    }

    #[test]
    fn test_group_overflow_is_error() {
        let layout = RebinLayout::new(4, 2, &[false; 4]).unwrap();
        assert!(matches!(
            layout.group_of(4),
            Err(MotionError::RebinOverflow { index: 2, count: 2 })
        ));
    }
}
