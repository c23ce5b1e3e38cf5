use log::info;
use uwimg::{colorize_sobel, feature_normalize, load_image, save_image, sobel_image, SobelOpts};

use std::env;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let SobelOpts { input, output } = SobelOpts::new(env::args());

    let im = load_image(&input)?;

    let (mut mag, _dir) = sobel_image(&im);
    feature_normalize(&mut mag);

    let colored = colorize_sobel(&mag)?;
    save_image(&colored, &output)?;

    info!("Wrote {}.jpg", output.display());

    Ok(())
}
