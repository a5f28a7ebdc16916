use ndarray::Array2;

use crate::align::warp::warp_frame;
use crate::error::Result;
use crate::frame::Shift;
use crate::pipeline::config::Interpolation;

use super::median::nan_median_stack;
use super::rebin::RebinGroups;

/// Build the reference image from the current group images.
///
/// The reference is the NaN-ignoring per-pixel median of the groups. A
/// non-zero centering offset `mid` is applied to the median so that
/// `reference(x, y) = median(x + mid.dx, y + mid.dy)`; pixels moved in from
/// outside take `fill`.
pub fn build_reference(
    groups: &RebinGroups,
    mid: Shift,
    interpolation: Interpolation,
    fill: f32,
) -> Result<Array2<f32>> {
    let median = nan_median_stack(&groups.views())?;
    if mid == Shift::default() {
        return Ok(median);
    }
    Ok(warp_frame(
        median.view(),
        Shift::new(-mid.dx, -mid.dy),
        interpolation,
        fill,
    ))
}
