use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod color;
mod edges;
mod error;
mod filter;
mod img;
mod resize;
mod threadpool;

pub use color::*;
pub use edges::*;
pub use error::{Error, Result};
pub use filter::*;
pub use img::*;
pub use resize::*;
pub use threadpool::ThreadPool;

/// Options for the colour sobel driver: `color_sobel [INPUT] [OUTPUT]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SobelOpts {
    pub input: PathBuf,
    /// Saved with `.jpg` appended.
    pub output: PathBuf,
}

impl SobelOpts {
    pub fn new<I: Iterator<Item = String>>(mut args: I) -> Self {
        args.next();

        let input = match args.next() {
            Some(p) => p,
            None => "data/dog.jpg".to_string(),
        };

        let output = match args.next() {
            Some(p) => p,
            None => "color_sobel".to_string(),
        };

        SobelOpts {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Options for the frequency split driver: `frequency_split [INPUT] [SIGMA]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyOpts {
    pub input: PathBuf,
    pub sigma: f32,
}

impl FrequencyOpts {
    pub fn new<I: Iterator<Item = String>>(mut args: I) -> Result<Self> {
        args.next();

        let input = match args.next() {
            Some(p) => p,
            None => "figs/ronbledore.jpg".to_string(),
        };

        let sigma = match args.next() {
            Some(s) => s.parse().map_err(|_| Error::InvalidParameter {
                name: "sigma",
                reason: format!("{s:?} is not a number"),
            })?,
            None => 2.0,
        };

        Ok(FrequencyOpts {
            input: input.into(),
            sigma,
        })
    }

    /// Output names are `<kind>_<input stem>`, e.g. `low-frequency_ronbledore`.
    pub fn output_name(&self, kind: &str) -> String {
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        format!("{kind}_{stem}")
    }
}

/// Low and high frequency parts of an image, plus their sum.
#[derive(Debug, Clone)]
pub struct FrequencySplit {
    pub low: Image,
    pub high: Image,
    pub reconstruct: Image,
}

pub fn split_frequencies(im: &Image, sigma: f32, pool: &ThreadPool) -> Result<FrequencySplit> {
    let filter = Arc::new(make_gaussian_filter(sigma)?);
    let low = convolve_image_threaded(Arc::new(im.clone()), filter, true, pool)?;
    let high = sub_image(im, &low)?;
    let reconstruct = add_image(&low, &high)?;

    Ok(FrequencySplit {
        low,
        high,
        reconstruct,
    })
}

/// Saves each part of `split` under `dir`, named after the input.
pub fn save_frequency_split(
    split: &FrequencySplit,
    opts: &FrequencyOpts,
    dir: &Path,
) -> Result<()> {
    save_image(&split.low, dir.join(opts.output_name("low-frequency")))?;
    save_image(&split.high, dir.join(opts.output_name("high-frequency")))?;
    save_image(&split.reconstruct, dir.join(opts.output_name("reconstruct")))?;

    info!("Frequency split of {} done", opts.input.display());

    Ok(())
}
