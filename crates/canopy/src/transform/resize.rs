use image::{ImageBuffer, Pixel};

/// Source taps and weights contributing to one output sample.
type Taps = Vec<(usize, f32)>;

/// Per-output-sample taps along one axis.
///
/// Shrinking: each output sample covers `src_len / dst_len` source samples and
/// weights them by overlap. Enlarging: linear interpolation between the two
/// nearest source centers, clamped at the edges. Weights sum to one.
fn axis_taps(src_len: usize, dst_len: usize) -> Vec<Taps> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|i| {
            let mut taps: Taps = if scale >= 1.0 {
                let start = i as f64 * scale;
                let end = ((i + 1) as f64 * scale).min(src_len as f64);
                let first = start.floor() as usize;
                let last = (end.ceil() as usize).min(src_len);
                (first..last)
                    .filter_map(|j| {
                        let overlap = end.min((j + 1) as f64) - start.max(j as f64);
                        (overlap > 1e-9).then_some((j, overlap as f32))
                    })
                    .collect()
            } else {
                let center = ((i as f64 + 0.5) * scale - 0.5).clamp(0.0, (src_len - 1) as f64);
                let j0 = center.floor() as usize;
                let frac = (center - j0 as f64) as f32;
                let j1 = (j0 + 1).min(src_len - 1);
                if frac > 0.0 && j1 != j0 {
                    vec![(j0, 1.0 - frac), (j1, frac)]
                } else {
                    vec![(j0, 1.0)]
                }
            };
            let sum: f32 = taps.iter().map(|t| t.1).sum();
            for t in taps.iter_mut() {
                t.1 /= sum;
            }
            taps
        })
        .collect()
}

/// Resize to `width`×`height` by area averaging.
///
/// Every output pixel is the coverage-weighted mean of the source pixels its
/// footprint overlaps, so shrinking does not alias. Works for any 8-bit
/// pixel type.
pub fn resize_area<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    if sw == 0 || sh == 0 || width == 0 || height == 0 {
        return out;
    }
    let (dw, dh) = (width as usize, height as usize);
    let ch = P::CHANNEL_COUNT as usize;
    let raw: &[u8] = src.as_raw();

    // Horizontal pass into an sh × dw float buffer.
    let x_taps = axis_taps(sw, dw);
    let mut rows = vec![0f32; sh * dw * ch];
    for y in 0..sh {
        let src_row = &raw[y * sw * ch..(y + 1) * sw * ch];
        let dst_row = &mut rows[y * dw * ch..(y + 1) * dw * ch];
        for (x, taps) in x_taps.iter().enumerate() {
            for &(sx, w) in taps {
                for c in 0..ch {
                    dst_row[x * ch + c] += w * src_row[sx * ch + c] as f32;
                }
            }
        }
    }

    // Vertical pass straight into the output buffer.
    let y_taps = axis_taps(sh, dh);
    let buf: &mut [u8] = &mut out;
    let mut acc = vec![0f32; dw * ch];
    for (y, taps) in y_taps.iter().enumerate() {
        acc.iter_mut().for_each(|v| *v = 0.0);
        for &(sy, w) in taps {
            let row = &rows[sy * dw * ch..(sy + 1) * dw * ch];
            for (a, v) in acc.iter_mut().zip(row) {
                *a += w * v;
            }
        }
        for (o, a) in buf[y * dw * ch..(y + 1) * dw * ch].iter_mut().zip(&acc) {
            *o = a.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
