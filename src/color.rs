use crate::error::{Error, Result};
use crate::img::Image;

fn require_rgb(im: &Image, op: &'static str) -> Result<()> {
    if im.c != 3 {
        return Err(Error::UnsupportedChannels {
            op,
            channels: im.c,
        });
    }
    Ok(())
}

/// Luma-weighted single channel copy of an RGB image.
pub fn rgb_to_grayscale(im: &Image) -> Result<Image> {
    require_rgb(im, "rgb_to_grayscale")?;

    let plane = im.w * im.h;
    let mut gray = Image::new(im.w, im.h, 1);

    for i in 0..plane {
        gray.data[i] =
            0.299 * im.data[i] + 0.587 * im.data[i + plane] + 0.114 * im.data[i + 2 * plane];
    }

    Ok(gray)
}

/// Adds `v` to every value of channel `c`. Unknown channels are ignored.
pub fn shift_image(im: &mut Image, c: usize, v: f32) {
    map_channel(im, c, |x| x + v);
}

/// Multiplies every value of channel `c` by `v`. Unknown channels are ignored.
pub fn scale_image(im: &mut Image, c: usize, v: f32) {
    map_channel(im, c, |x| x * v);
}

fn map_channel(im: &mut Image, c: usize, f: impl Fn(f32) -> f32) {
    if c >= im.c {
        return;
    }

    let plane = im.w * im.h;
    for x in &mut im.data[c * plane..(c + 1) * plane] {
        *x = f(*x);
    }
}

pub fn clamp_image(im: &mut Image) {
    for v in im.data.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
}

fn three_way_max(a: f32, b: f32, c: f32) -> f32 {
    a.max(b).max(c)
}

fn three_way_min(a: f32, b: f32, c: f32) -> f32 {
    a.min(b).min(c)
}

/// Converts RGB to HSV in place. Hue is stored in `[0, 1)`.
pub fn rgb_to_hsv(im: &mut Image) -> Result<()> {
    require_rgb(im, "rgb_to_hsv")?;

    let plane = im.w * im.h;

    for i in 0..plane {
        let (r, g, b) = (im.data[i], im.data[i + plane], im.data[i + 2 * plane]);

        let v = three_way_max(r, g, b);
        let chroma = v - three_way_min(r, g, b);
        let s = if v == 0.0 { 0.0 } else { chroma / v };

        let h = if chroma == 0.0 {
            0.0
        } else {
            let h_dash = if v == r {
                (g - b) / chroma
            } else if v == g {
                (b - r) / chroma + 2.0
            } else {
                (r - g) / chroma + 4.0
            };

            if h_dash < 0.0 {
                h_dash / 6.0 + 1.0
            } else {
                h_dash / 6.0
            }
        };

        im.data[i] = h;
        im.data[i + plane] = s;
        im.data[i + 2 * plane] = v;
    }

    Ok(())
}

/// Converts HSV (hue in `[0, 1)`) back to RGB in place.
pub fn hsv_to_rgb(im: &mut Image) -> Result<()> {
    require_rgb(im, "hsv_to_rgb")?;

    let plane = im.w * im.h;

    for i in 0..plane {
        let (h, s, v) = (im.data[i], im.data[i + plane], im.data[i + 2 * plane]);

        let h6 = h.rem_euclid(1.0) * 6.0;
        let mut sector = h6.floor();
        let f = h6 - sector;
        // tiny negative hues wrap to exactly 1.0
        if sector >= 6.0 {
            sector = 0.0;
        }

        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match sector as u32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };

        im.data[i] = r;
        im.data[i + plane] = g;
        im.data[i + 2 * plane] = b;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(r: f32, g: f32, b: f32) -> Image {
        Image::from_raw(1, 1, 3, vec![r, g, b]).unwrap()
    }

    #[test]
    fn grayscale_weights() {
        let gray = rgb_to_grayscale(&pixel(1.0, 0.0, 0.0)).unwrap();
        assert!((gray.data[0] - 0.299).abs() < 1e-6);

        let gray = rgb_to_grayscale(&pixel(1.0, 1.0, 1.0)).unwrap();
        assert!((gray.data[0] - 1.0).abs() < 1e-6);

        assert!(rgb_to_grayscale(&Image::new(1, 1, 1)).is_err());
    }

    #[test]
    fn shift_and_clamp() {
        let mut im = pixel(0.25, 0.5, 0.75);
        shift_image(&mut im, 1, 0.75);
        shift_image(&mut im, 7, 1.0);
        scale_image(&mut im, 2, 2.0);
        assert_eq!(im.data, vec![0.25, 1.25, 1.5]);

        clamp_image(&mut im);
        assert_eq!(im.data, vec![0.25, 1.0, 1.0]);
    }

    #[test]
    fn primaries_map_to_expected_hues() {
        let mut red = pixel(1.0, 0.0, 0.0);
        rgb_to_hsv(&mut red).unwrap();
        assert_eq!(red.data, vec![0.0, 1.0, 1.0]);

        let mut green = pixel(0.0, 1.0, 0.0);
        rgb_to_hsv(&mut green).unwrap();
        assert!((green.data[0] - 1.0 / 3.0).abs() < 1e-6);

        let mut magenta = pixel(1.0, 0.0, 1.0);
        rgb_to_hsv(&mut magenta).unwrap();
        assert!((magenta.data[0] - 5.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn black_has_no_saturation() {
        let mut black = pixel(0.0, 0.0, 0.0);
        rgb_to_hsv(&mut black).unwrap();
        assert_eq!(black.data, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn hue_just_below_zero_is_red() {
        let mut im = pixel(-1e-9, 1.0, 1.0);
        hsv_to_rgb(&mut im).unwrap();
        assert_eq!(im.data, vec![1.0, 0.0, 0.0]);

        let mut im = pixel(1.0, 1.0, 1.0);
        hsv_to_rgb(&mut im).unwrap();
        assert_eq!(im.data, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn hsv_round_trip() {
        let samples = [
            (0.8, 0.3, 0.1),
            (0.1, 0.9, 0.4),
            (0.25, 0.25, 0.75),
            (0.6, 0.6, 0.6),
            (0.9, 0.05, 0.5),
        ];

        for (r, g, b) in samples {
            let mut im = pixel(r, g, b);
            rgb_to_hsv(&mut im).unwrap();
            hsv_to_rgb(&mut im).unwrap();

            for (got, want) in im.data.iter().zip([r, g, b]) {
                assert!((got - want).abs() < 1e-5, "{got} != {want}");
            }
        }
    }
}
