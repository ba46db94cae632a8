//! Geometric resampling used by the aligner: projective warping onto the
//! reference canvas and area-averaging resize for the fallback path.

mod resize;
mod warp;

pub use resize::resize_area;
pub use warp::warp_perspective;
