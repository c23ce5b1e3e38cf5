use uwimg::{load_image, save_frequency_split, split_frequencies, FrequencyOpts, ThreadPool};

use std::env;
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opts = FrequencyOpts::new(env::args())?;

    let im = load_image(&opts.input)?;

    let pool = ThreadPool::with_available_parallelism();
    let split = split_frequencies(&im, opts.sigma, &pool)?;

    save_frequency_split(&split, &opts, Path::new("."))?;

    Ok(())
}
