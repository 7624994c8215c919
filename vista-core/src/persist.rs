use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageResult};

/// Name of the file written for an image produced at `timestamp`.
///
/// One-second resolution; two images saved within the same second share a name.
pub fn file_name_for(timestamp: DateTime<Utc>) -> String {
    format!("{}.png", timestamp.format("%Y%m%d%H%M%S"))
}

/// Writes `image` into `output_dir` under the current UTC timestamp.
///
/// The prompt does not take part in the file name.
pub fn save_image(image: &DynamicImage, _prompt: &str, output_dir: &Path) -> ImageResult<PathBuf> {
    save_image_at(image, output_dir, Utc::now())
}

pub fn save_image_at(
    image: &DynamicImage,
    output_dir: &Path,
    timestamp: DateTime<Utc>,
) -> ImageResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name_for(timestamp));
    image.save(&path)?;
    Ok(path)
}
