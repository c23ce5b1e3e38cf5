use grid::*;
use log::debug;
use std::sync::{mpsc, Arc};

use crate::error::{Error, Result};
use crate::img::Image;
use crate::threadpool::ThreadPool;

/// A single channel convolution kernel. Rows run along `y`, columns along `x`.
#[derive(Debug, Clone)]
pub struct Filter {
    pub kernel: Grid<f32>,
}

impl Filter {
    fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        let data = rows.iter().flatten().copied().collect();
        Filter {
            kernel: Grid::from_vec(data, 3),
        }
    }

    pub fn w(&self) -> usize {
        self.kernel.cols()
    }

    pub fn h(&self) -> usize {
        self.kernel.rows()
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.kernel.get(y, x).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f32 {
        self.kernel.iter().sum()
    }

    /// Divides every weight by the total so the kernel sums to one.
    pub fn l1_normalize(&mut self) {
        let sum = self.sum();
        if sum == 0.0 {
            return;
        }

        for el in self.kernel.iter_mut() {
            *el /= sum;
        }
    }
}

pub fn make_box_filter(w: usize) -> Result<Filter> {
    if w == 0 {
        return Err(Error::InvalidParameter {
            name: "w",
            reason: "box filter needs a positive width".to_string(),
        });
    }

    let mut filter = Filter {
        kernel: Grid::init(w, w, 1.0),
    };
    filter.l1_normalize();

    Ok(filter)
}

pub fn make_highpass_filter() -> Filter {
    Filter::from_rows([[0.0, -1.0, 0.0], [-1.0, 4.0, -1.0], [0.0, -1.0, 0.0]])
}

pub fn make_sharpen_filter() -> Filter {
    Filter::from_rows([[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]])
}

pub fn make_emboss_filter() -> Filter {
    Filter::from_rows([[-2.0, -1.0, 0.0], [-1.0, 1.0, 1.0], [0.0, 1.0, 2.0]])
}

pub fn make_gx_filter() -> Filter {
    Filter::from_rows([[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]])
}

pub fn make_gy_filter() -> Filter {
    Filter::from_rows([[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]])
}

fn gaussian(x: i32, y: i32, sigma: f32) -> f32 {
    (-((x * x + y * y) as f32) / (2.0 * sigma * sigma)).exp()
        / (2.0 * std::f32::consts::PI * sigma * sigma)
}

/// Largest side length `make_gaussian_filter` will build.
pub const MAX_GAUSSIAN_SIZE: usize = 4095;

/// Gaussian kernel covering three sigmas either side, always of odd size.
pub fn make_gaussian_filter(sigma: f32) -> Result<Filter> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(Error::InvalidParameter {
            name: "sigma",
            reason: format!("must be positive and finite, got {sigma}"),
        });
    }

    let span = (6.0 * sigma).ceil();
    if span > MAX_GAUSSIAN_SIZE as f32 {
        return Err(Error::InvalidParameter {
            name: "sigma",
            reason: format!("{sigma} needs a kernel wider than {MAX_GAUSSIAN_SIZE}"),
        });
    }

    let mut size = span as usize;
    if size % 2 == 0 {
        size += 1;
    }
    let half = (size / 2) as i32;

    let mut kernel = Grid::new(size, size);

    for y in 0..size {
        for x in 0..size {
            if let Some(el) = kernel.get_mut(y, x) {
                *el = gaussian(x as i32 - half, y as i32 - half, sigma);
            }
        }
    }

    let mut filter = Filter { kernel };
    filter.l1_normalize();

    debug!("Gaussian filter sigma={} size={}x{}", sigma, size, size);

    Ok(filter)
}

fn output_channels(im: &Image, preserve: bool) -> usize {
    if preserve {
        im.c
    } else {
        1
    }
}

/// Weighted sum around `(x, y)`. Without `preserve` the input channels are
/// summed into the single output channel.
fn calculate_new_pixel(
    x: i32,
    y: i32,
    c: usize,
    preserve: bool,
    filter: &Filter,
    im: &Image,
) -> f32 {
    let half_w = filter.w() as i32 / 2;
    let half_h = filter.h() as i32 / 2;

    let channels = if preserve { c..c + 1 } else { 0..im.c };

    let mut sum = 0.0;
    for ic in channels {
        for fy in 0..filter.h() {
            for fx in 0..filter.w() {
                let px = im.get_pixel(x + fx as i32 - half_w, y + fy as i32 - half_h, ic as i32);
                sum += px * filter.get(fx, fy);
            }
        }
    }

    sum
}

fn convolve_row(y: usize, preserve: bool, filter: &Filter, im: &Image) -> Vec<f32> {
    let channels = output_channels(im, preserve);
    let mut row = Vec::with_capacity(channels * im.w);

    for c in 0..channels {
        for x in 0..im.w {
            row.push(calculate_new_pixel(x as i32, y as i32, c, preserve, filter, im));
        }
    }

    row
}

fn write_row(out: &mut Image, y: usize, row: &[f32]) {
    for (c, values) in row.chunks(out.w).enumerate() {
        for (x, &v) in values.iter().enumerate() {
            out.set_pixel(x as i32, y as i32, c as i32, v);
        }
    }
}

/// Convolves `im` with `filter`, clamping reads at the border.
///
/// With `preserve` every channel is filtered on its own and the result keeps
/// `im.c` channels; otherwise the result has one channel.
pub fn convolve_image(im: &Image, filter: &Filter, preserve: bool) -> Image {
    let mut out = Image::new(im.w, im.h, output_channels(im, preserve));

    for y in 0..im.h {
        let row = convolve_row(y, preserve, filter, im);
        write_row(&mut out, y, &row);
    }

    out
}

/// Same result as [`convolve_image`], with rows spread across a thread pool.
pub fn convolve_image_threaded(
    im: Arc<Image>,
    filter: Arc<Filter>,
    preserve: bool,
    pool: &ThreadPool,
) -> Result<Image> {
    let height = im.h;
    let mut out = Image::new(im.w, im.h, output_channels(&im, preserve));

    debug!(
        "Convolving {}x{}x{} with {}x{} kernel on {} workers",
        im.w,
        im.h,
        im.c,
        filter.w(),
        filter.h(),
        pool.size()
    );

    let (tx, rx) = mpsc::channel();

    for y in 0..height {
        let im = Arc::clone(&im);
        let filter = Arc::clone(&filter);
        let tx = tx.clone();

        pool.execute(move || {
            let row = convolve_row(y, preserve, &filter, &im);
            // The receiver only goes away if the caller already bailed out.
            let _ = tx.send((y, row));
        })?;
    }
    drop(tx);

    let mut counter = 0;
    let mut last = 0;

    while let Ok((y, row)) = rx.recv() {
        write_row(&mut out, y, &row);
        counter += 1;

        let percent = counter * 100 / height;
        if percent / 10 != last / 10 {
            debug!("{}% done", percent);
            last = percent;
        }
    }

    if counter != height {
        return Err(Error::PoolClosed);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: usize, h: usize, c: usize) -> Image {
        let mut im = Image::new(w, h, c);
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    let v = ((x + y + ch) % 2) as f32 * 0.5 + ch as f32 * 0.1;
                    im.set_pixel(x as i32, y as i32, ch as i32, v);
                }
            }
        }
        im
    }

    #[test]
    fn gaussian_is_odd_and_normalized() {
        for sigma in [0.5, 1.0, 2.0, 3.3] {
            let f = make_gaussian_filter(sigma).unwrap();
            assert_eq!(f.w() % 2, 1);
            assert_eq!(f.w(), f.h());
            assert!((f.sum() - 1.0).abs() < 1e-4);
        }

        assert_eq!(make_gaussian_filter(2.0).unwrap().w(), 13);
    }

    #[test]
    fn gaussian_peaks_in_the_centre() {
        let f = make_gaussian_filter(1.0).unwrap();
        let centre = f.get(3, 3);
        assert!(f.kernel.iter().all(|&v| v <= centre));
        assert!((f.get(0, 3) - f.get(6, 3)).abs() < 1e-7);
    }

    #[test]
    fn gaussian_rejects_bad_sigma() {
        assert!(make_gaussian_filter(0.0).is_err());
        assert!(make_gaussian_filter(-1.0).is_err());
        assert!(make_gaussian_filter(f32::NAN).is_err());
        assert!(make_gaussian_filter(f32::INFINITY).is_err());
    }

    #[test]
    fn gaussian_rejects_oversized_kernel() {
        let res = make_gaussian_filter(1e10);
        assert!(matches!(res, Err(Error::InvalidParameter { name: "sigma", .. })));

        let just_over = (MAX_GAUSSIAN_SIZE + 1) as f32 / 6.0;
        assert!(make_gaussian_filter(just_over).is_err());
    }

    #[test]
    fn box_filter_is_uniform() {
        let f = make_box_filter(3).unwrap();
        assert!(f.kernel.iter().all(|&v| (v - 1.0 / 9.0).abs() < 1e-7));
        assert!(make_box_filter(0).is_err());
    }

    #[test]
    fn box_blur_keeps_constant_image() {
        let mut im = Image::new(5, 5, 3);
        im.data.iter_mut().for_each(|v| *v = 0.4);

        let out = convolve_image(&im, &make_box_filter(3).unwrap(), true);
        assert_eq!(out.shape(), (5, 5, 3));
        assert!(out.data.iter().all(|&v| (v - 0.4).abs() < 1e-6));
    }

    #[test]
    fn highpass_of_constant_is_zero() {
        let mut im = Image::new(4, 4, 1);
        im.data.iter_mut().for_each(|v| *v = 0.7);

        let out = convolve_image(&im, &make_highpass_filter(), true);
        assert!(out.data.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn no_preserve_sums_channels() {
        let im = checker(4, 3, 3);
        let identity = Filter {
            kernel: Grid::from_vec(vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0], 3),
        };

        let out = convolve_image(&im, &identity, false);
        assert_eq!(out.shape(), (4, 3, 1));

        let expected = im.get_pixel(2, 1, 0) + im.get_pixel(2, 1, 1) + im.get_pixel(2, 1, 2);
        assert!((out.get_pixel(2, 1, 0) - expected).abs() < 1e-6);
    }

    #[test]
    fn gx_responds_to_vertical_edge() {
        let mut im = Image::new(6, 3, 1);
        for y in 0..3 {
            for x in 3..6 {
                im.set_pixel(x, y, 0, 1.0);
            }
        }

        let gx = convolve_image(&im, &make_gx_filter(), false);
        assert!((gx.get_pixel(2, 1, 0) - 4.0).abs() < 1e-6);
        assert_eq!(gx.get_pixel(0, 1, 0), 0.0);

        let gy = convolve_image(&im, &make_gy_filter(), false);
        assert!(gy.data.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn threaded_matches_sequential() {
        let im = checker(17, 11, 3);
        let filter = make_gaussian_filter(1.5).unwrap();
        let pool = ThreadPool::new(3);

        for preserve in [true, false] {
            let expected = convolve_image(&im, &filter, preserve);
            let got = convolve_image_threaded(
                Arc::new(im.clone()),
                Arc::new(filter.clone()),
                preserve,
                &pool,
            )
            .unwrap();
            assert_eq!(got, expected);
        }
    }
}
