use crate::error::{Error, Result};
use crate::img::Image;

fn check_size(w: usize, h: usize) -> Result<()> {
    if w == 0 || h == 0 {
        return Err(Error::InvalidParameter {
            name: "size",
            reason: format!("cannot resize to {w}x{h}"),
        });
    }
    Ok(())
}

pub fn nn_interpolate(im: &Image, x: f32, y: f32, c: usize) -> f32 {
    im.get_pixel(x.round() as i32, y.round() as i32, c as i32)
}

pub fn bilinear_interpolate(im: &Image, x: f32, y: f32, c: usize) -> f32 {
    let x1 = x.floor();
    let y1 = y.floor();
    let dx = x - x1;
    let dy = y - y1;

    let (x1, y1, c) = (x1 as i32, y1 as i32, c as i32);

    let q11 = im.get_pixel(x1, y1, c);
    let q21 = im.get_pixel(x1 + 1, y1, c);
    let q12 = im.get_pixel(x1, y1 + 1, c);
    let q22 = im.get_pixel(x1 + 1, y1 + 1, c);

    (1.0 - dx) * (1.0 - dy) * q11 + dx * (1.0 - dy) * q21 + (1.0 - dx) * dy * q12 + dx * dy * q22
}

fn resize_with(
    im: &Image,
    w: usize,
    h: usize,
    interpolate: fn(&Image, f32, f32, usize) -> f32,
) -> Result<Image> {
    check_size(w, h)?;

    let mut out = Image::new(w, h, im.c);
    if im.w == 0 || im.h == 0 {
        return Ok(out);
    }

    let x_scale = im.w as f32 / w as f32;
    let y_scale = im.h as f32 / h as f32;

    for c in 0..im.c {
        for j in 0..h {
            for i in 0..w {
                let x = (i as f32 + 0.5) * x_scale - 0.5;
                let y = (j as f32 + 0.5) * y_scale - 0.5;
                out.set_pixel(i as i32, j as i32, c as i32, interpolate(im, x, y, c));
            }
        }
    }

    Ok(out)
}

/// Nearest neighbour resize, mapping pixel centres onto each other.
pub fn nn_resize(im: &Image, w: usize, h: usize) -> Result<Image> {
    resize_with(im, w, h, nn_interpolate)
}

/// Bilinear resize, mapping pixel centres onto each other.
pub fn bilinear_resize(im: &Image, w: usize, h: usize) -> Result<Image> {
    resize_with(im, w, h, bilinear_interpolate)
}
