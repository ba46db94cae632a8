use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use nalgebra::Matrix3;

/// Warp `src` through `h` into a black `width`×`height` canvas.
///
/// `h` maps source pixel coordinates to canvas coordinates. Canvas pixels
/// whose preimage falls outside `src` stay `(0, 0, 0)`. Returns `None` if
/// `h` is non-finite or singular.
pub fn warp_perspective(
    src: &RgbImage,
    h: &Matrix3<f64>,
    width: u32,
    height: u32,
) -> Option<RgbImage> {
    let h = if h[(2, 2)].abs() > 1e-12 {
        h / h[(2, 2)]
    } else {
        *h
    };
    let mut coeffs = [0f32; 9];
    for r in 0..3 {
        for c in 0..3 {
            coeffs[3 * r + c] = h[(r, c)] as f32;
        }
    }
    if !coeffs.iter().all(|v| v.is_finite()) {
        return None;
    }
    let projection = Projection::from_matrix(coeffs)?;

    let mut out = RgbImage::new(width, height);
    warp_into(
        src,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut out,
    );
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::textured_rgb;

    #[test]
    fn identity_preserves_interior() {
        let src = textured_rgb(64, 48, 2);
        let out = warp_perspective(&src, &Matrix3::identity(), 64, 48).unwrap();
        for y in 0..47 {
            for x in 0..63 {
                assert_eq!(out.get_pixel(x, y), src.get_pixel(x, y), "({x}, {y})");
            }
        }
    }

    #[test]
    fn translation_shifts_content_and_blacks_out_the_rest() {
        let src = textured_rgb(64, 48, 3);
        #[rustfmt::skip]
        let h = Matrix3::new(
            1.0, 0.0, 5.0,
            0.0, 1.0, 3.0,
            0.0, 0.0, 1.0,
        );
        let out = warp_perspective(&src, &h, 80, 60).unwrap();
        assert_eq!(out.dimensions(), (80, 60));
        assert_eq!(out.get_pixel(15, 11), src.get_pixel(10, 8));
        assert_eq!(out.get_pixel(40, 30), src.get_pixel(35, 27));
        assert_eq!(*out.get_pixel(2, 1), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(75, 55), Rgb([0, 0, 0]));
    }

    #[test]
    fn scaled_matrix_is_equivalent() {
        let src = textured_rgb(40, 40, 4);
        #[rustfmt::skip]
        let h = Matrix3::new(
            2.0, 0.0, 4.0,
            0.0, 2.0, 2.0,
            0.0, 0.0, 2.0,
        );
        let out = warp_perspective(&src, &h, 40, 40).unwrap();
        assert_eq!(out.get_pixel(12, 11), src.get_pixel(10, 10));
    }

    #[test]
    fn singular_or_non_finite_is_rejected() {
        let src = textured_rgb(16, 16, 5);
        let singular = Matrix3::new(1.0, 2.0, 0.0, 2.0, 4.0, 0.0, 0.0, 0.0, 1.0);
        assert!(warp_perspective(&src, &singular, 16, 16).is_none());
        let mut nan = Matrix3::identity();
        nan[(0, 1)] = f64::NAN;
        assert!(warp_perspective(&src, &nan, 16, 16).is_none());
    }
}
