use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Elementwise operations need both images to have the same `w`, `h` and `c`.
    #[error("image shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },

    #[error("{op} does not support {channels}-channel images")]
    UnsupportedChannels { op: &'static str, channels: usize },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("thread pool is no longer accepting jobs")]
    PoolClosed,
}

pub type Result<T> = std::result::Result<T, Error>;
