use ::image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use log::info;
use std::ffi::OsString;
use std::ops::{Add, Sub};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A floating point image stored channel by channel (CHW).
///
/// Values are nominally in `[0, 1]`, but intermediate results such as
/// residuals and gradients are free to leave that range. They are only
/// clamped when written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub w: usize,
    pub h: usize,
    pub c: usize,
    pub data: Vec<f32>,
}

impl Image {
    pub fn new(w: usize, h: usize, c: usize) -> Self {
        Image {
            w,
            h,
            c,
            data: vec![0.0; w * h * c],
        }
    }

    pub fn from_raw(w: usize, h: usize, c: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != w * h * c {
            return Err(Error::InvalidParameter {
                name: "data",
                reason: format!("expected {} values, got {}", w * h * c, data.len()),
            });
        }

        Ok(Image { w, h, c, data })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.w, self.h, self.c)
    }

    fn index(&self, x: usize, y: usize, c: usize) -> usize {
        c * self.w * self.h + y * self.w + x
    }

    /// Reads a pixel, clamping out of range coordinates to the border.
    /// Empty images read as `0.0`.
    pub fn get_pixel(&self, x: i32, y: i32, c: i32) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }

        let x = x.clamp(0, self.w as i32 - 1) as usize;
        let y = y.clamp(0, self.h as i32 - 1) as usize;
        let c = c.clamp(0, self.c as i32 - 1) as usize;

        self.data[self.index(x, y, c)]
    }

    /// Writes a pixel. Writes outside the image are dropped.
    pub fn set_pixel(&mut self, x: i32, y: i32, c: i32, v: f32) {
        if x < 0
            || y < 0
            || c < 0
            || x >= self.w as i32
            || y >= self.h as i32
            || c >= self.c as i32
        {
            return;
        }

        let i = self.index(x as usize, y as usize, c as usize);
        self.data[i] = v;
    }

    /// Divides every value by the total sum, leaving all-zero images alone.
    pub fn l1_normalize(&mut self) {
        let sum: f32 = self.data.iter().sum();
        if sum == 0.0 {
            return;
        }

        for v in self.data.iter_mut() {
            *v /= sum;
        }
    }

    fn to_dynamic(&self) -> Result<DynamicImage> {
        match self.c {
            1 => Ok(DynamicImage::ImageLuma8(GrayImage::from_fn(
                self.w as u32,
                self.h as u32,
                |x, y| Luma([quantize(self.get_pixel(x as i32, y as i32, 0))]),
            ))),
            3 => Ok(DynamicImage::ImageRgb8(RgbImage::from_fn(
                self.w as u32,
                self.h as u32,
                |x, y| {
                    let (x, y) = (x as i32, y as i32);
                    Rgb([
                        quantize(self.get_pixel(x, y, 0)),
                        quantize(self.get_pixel(x, y, 1)),
                        quantize(self.get_pixel(x, y, 2)),
                    ])
                },
            ))),
            channels => Err(Error::UnsupportedChannels {
                op: "save_image",
                channels,
            }),
        }
    }
}

fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn from_rgb(img: &RgbImage) -> Image {
    let mut im = Image::new(img.width() as usize, img.height() as usize, 3);

    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..3 {
            im.set_pixel(x as i32, y as i32, c, pixel[c as usize] as f32 / 255.0);
        }
    }

    im
}

fn from_luma(img: &GrayImage) -> Image {
    let mut im = Image::new(img.width() as usize, img.height() as usize, 1);

    for (x, y, pixel) in img.enumerate_pixels() {
        im.set_pixel(x as i32, y as i32, 0, pixel[0] as f32 / 255.0);
    }

    im
}

/// Loads an image from disk. Grayscale files become single channel images,
/// everything else is converted to RGB with any alpha channel dropped.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image> {
    let path = path.as_ref();

    let dynamic = ::image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let im = match dynamic.color().channel_count() {
        1 | 2 => from_luma(&dynamic.to_luma8()),
        _ => from_rgb(&dynamic.to_rgb8()),
    };

    info!("Loaded {}: {}x{}x{}", path.display(), im.w, im.h, im.c);

    Ok(im)
}

fn with_extension<P: AsRef<Path>>(name: P, ext: &str) -> PathBuf {
    let mut path = OsString::from(name.as_ref().as_os_str());
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}

fn write_image(im: &Image, path: PathBuf) -> Result<()> {
    let dynamic = im.to_dynamic()?;

    dynamic
        .save(&path)
        .map_err(|source| Error::ImageSave {
            path: path.clone(),
            source,
        })?;

    info!("Saved {}", path.display());

    Ok(())
}

/// Saves `im` as a JPEG, appending `.jpg` to `name`.
pub fn save_image<P: AsRef<Path>>(im: &Image, name: P) -> Result<()> {
    write_image(im, with_extension(name, "jpg"))
}

/// Saves `im` as a PNG, appending `.png` to `name`.
pub fn save_png<P: AsRef<Path>>(im: &Image, name: P) -> Result<()> {
    write_image(im, with_extension(name, "png"))
}

fn zip_with(a: &Image, b: &Image, f: impl Fn(f32, f32) -> f32) -> Result<Image> {
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            left: a.shape(),
            right: b.shape(),
        });
    }

    let data = a.data.iter().zip(&b.data).map(|(&x, &y)| f(x, y)).collect();

    Ok(Image {
        w: a.w,
        h: a.h,
        c: a.c,
        data,
    })
}

pub fn add_image(a: &Image, b: &Image) -> Result<Image> {
    zip_with(a, b, |x, y| x + y)
}

pub fn sub_image(a: &Image, b: &Image) -> Result<Image> {
    zip_with(a, b, |x, y| x - y)
}

impl Add for &Image {
    type Output = Image;

    /// Panics when the shapes differ; use [`add_image`] to handle that case.
    fn add(self, rhs: Self) -> Image {
        match add_image(self, rhs) {
            Ok(im) => im,
            Err(e) => panic!("{e}"),
        }
    }
}

impl Sub for &Image {
    type Output = Image;

    /// Panics when the shapes differ; use [`sub_image`] to handle that case.
    fn sub(self, rhs: Self) -> Image {
        match sub_image(self, rhs) {
            Ok(im) => im,
            Err(e) => panic!("{e}"),
        }
    }
}

impl Add for Image {
    type Output = Image;

    fn add(self, rhs: Image) -> Image {
        &self + &rhs
    }
}

impl Sub for Image {
    type Output = Image;

    fn sub(self, rhs: Image) -> Image {
        &self - &rhs
    }
}
