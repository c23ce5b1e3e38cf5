use log::debug;

use crate::color::{clamp_image, hsv_to_rgb};
use crate::error::Result;
use crate::filter::{convolve_image, make_gaussian_filter, make_gx_filter, make_gy_filter};
use crate::img::Image;

/// Sobel gradient of `im`, returned as `(magnitude, direction)`.
///
/// Both outputs have one channel; all input channels are summed into the
/// gradient. Direction is `atan2(gy, gx)` in radians.
pub fn sobel_image(im: &Image) -> (Image, Image) {
    let gx = convolve_image(im, &make_gx_filter(), false);
    let gy = convolve_image(im, &make_gy_filter(), false);

    let mut mag = Image::new(im.w, im.h, 1);
    let mut dir = Image::new(im.w, im.h, 1);

    for (i, (&x, &y)) in gx.data.iter().zip(&gy.data).enumerate() {
        mag.data[i] = (x * x + y * y).sqrt();
        dir.data[i] = y.atan2(x);
    }

    (mag, dir)
}

/// Rescales `im` in place so it spans `[0, 1]`. A flat image becomes all zeros.
pub fn feature_normalize(im: &mut Image) {
    let (min, max) = im
        .data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;

    if range == 0.0 || !range.is_finite() {
        im.data.iter_mut().for_each(|v| *v = 0.0);
        return;
    }

    debug!("feature_normalize: min={} max={}", min, max);

    for v in im.data.iter_mut() {
        *v = (*v - min) / range;
    }
}

/// Colour codes the edges of `im`: hue follows gradient direction, saturation
/// and value follow gradient magnitude.
pub fn colorize_sobel(im: &Image) -> Result<Image> {
    let (mut mag, mut dir) = sobel_image(im);
    feature_normalize(&mut mag);
    feature_normalize(&mut dir);

    let plane = im.w * im.h;
    let mut hsv = Image::new(im.w, im.h, 3);
    hsv.data[..plane].copy_from_slice(&dir.data);
    hsv.data[plane..2 * plane].copy_from_slice(&mag.data);
    hsv.data[2 * plane..].copy_from_slice(&mag.data);

    hsv_to_rgb(&mut hsv)?;

    let mut out = convolve_image(&hsv, &make_gaussian_filter(1.0)?, true);
    clamp_image(&mut out);

    Ok(out)
}
