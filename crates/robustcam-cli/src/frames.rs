//! Frame I/O between image files and `ndarray` buffers.
//!
//! Files are decoded to 8-bit RGB and held channel-last `(h, w, 3)`.
//! Perturbed frames arrive channel-first and are transposed back before
//! encoding.

use image::RgbImage;
use ndarray::{Array3, ArrayView3};
use robustcam_perturb::image::{image_from_raw, to_channel_last};
use std::path::{Path, PathBuf};

use crate::error::RunError;

/// Decode `path` into a channel-last RGB array.
pub fn load_rgb(path: &Path) -> Result<Array3<u8>, RunError> {
    let rgb = image::open(path)?.to_rgb8();
    let (w, h) = rgb.dimensions();
    Ok(image_from_raw(&[h as usize, w as usize, 3], rgb.into_raw())?)
}

/// Encode a channel-first `(3, h, w)` frame to `path`; the format follows the
/// file extension.
pub fn save_channel_first(path: &Path, frame: ArrayView3<u8>) -> Result<(), RunError> {
    let (_, h, w) = frame.dim();
    let pixels = to_channel_last(frame).into_raw_vec();
    let rgb = RgbImage::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| RunError::Buffer(path.to_path_buf()))?;
    rgb.save(path)?;
    Ok(())
}

/// `<dir>/<prefix>_<stem>.png` for a source image path.
pub fn derived_path(dir: &Path, prefix: &str, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    dir.join(format!("{prefix}_{stem}.png"))
}

/// File-system friendly form of a scenario label (`"R darker/3"` → `r_darker_3`).
pub fn slug(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use robustcam_perturb::image::to_channel_first;

    #[test]
    fn png_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("frame.png");
        let img = Array3::from_shape_fn((5, 7, 3), |(y, x, c)| (y * 40 + x * 3 + c * 17) as u8);

        save_channel_first(&path, to_channel_first(img.view()).view()).expect("save");
        let loaded = load_rgb(&path).expect("load");
        assert_eq!(loaded, img);
    }

    #[test]
    fn loading_a_missing_file_is_an_image_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = load_rgb(&dir.path().join("absent.png")).expect_err("missing");
        assert!(matches!(err, RunError::Image(_)), "{err}");
    }

    #[test]
    fn derived_paths_and_slugs() {
        let p = derived_path(Path::new("out"), "combined", Path::new("/data/cam_01.jpg"));
        assert_eq!(p, PathBuf::from("out/combined_cam_01.png"));
        assert_eq!(slug("R darker/3"), "r_darker_3");
        assert_eq!(slug("combined/5"), "combined_5");
    }
}
