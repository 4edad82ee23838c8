use super::{ArtifactError, CoverPipeline};
use image::{DynamicImage, ImageFormat};
use reqwest::blocking::Client;
use reqwest::Url;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_EXTENSION: &str = ".jpg";

/// Downloads the full cover and cuts the poster out of its right half
pub struct CoverDownloader {
    client: Client,
}

impl CoverDownloader {
    pub fn new(timeout_ms: u64, user_agent: &str) -> Result<Self, ArtifactError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(|e| ArtifactError::Download(e.to_string()))?;

        Ok(Self { client })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ArtifactError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ArtifactError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::Download(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .map_err(|e| ArtifactError::Download(e.to_string()))?;
        debug!(url, size = bytes.len(), "Cover downloaded");

        Ok(bytes.to_vec())
    }
}

impl CoverPipeline for CoverDownloader {
    fn download_and_save_covers(&self, cover_url: &str, output_dir: &Path) -> Result<(), ArtifactError> {
        let url = Url::parse(cover_url).map_err(|_| ArtifactError::InvalidCoverUrl(cover_url.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ArtifactError::InvalidCoverUrl(cover_url.to_string()));
        }

        let bytes = self.download(cover_url)?;
        save_covers(&bytes, cover_url, output_dir)
    }
}

/// Write `fanart{ext}` verbatim and `poster{ext}` cropped from it
pub(crate) fn save_covers(bytes: &[u8], cover_url: &str, output_dir: &Path) -> Result<(), ArtifactError> {
    let ext = cover_extension(cover_url);
    let fanart_path = output_dir.join(format!("fanart{}", ext));
    let poster_path = output_dir.join(format!("poster{}", ext));

    fs::write(&fanart_path, bytes)?;

    let format = ImageFormat::from_extension(ext.trim_start_matches('.')).unwrap_or(ImageFormat::Jpeg);
    let poster = split_cover(bytes)?;
    let poster = match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(poster.to_rgb8()),
        _ => poster,
    };

    poster
        .save_with_format(&poster_path, format)
        .map_err(|e| ArtifactError::Image(e.to_string()))?;

    info!(fanart = ?fanart_path, poster = ?poster_path, "Covers saved");
    Ok(())
}

/// Return the right half of a cover image.
///
/// The crop starts at `ceil(width / 2)`, so for odd widths the middle
/// column belongs to the left half.
pub fn split_cover(bytes: &[u8]) -> Result<DynamicImage, ArtifactError> {
    let image = image::load_from_memory(bytes).map_err(|e| ArtifactError::Image(e.to_string()))?;

    let width = image.width();
    let height = image.height();
    let left = width.div_ceil(2);

    if width - left == 0 || height == 0 {
        return Err(ArtifactError::Image(format!(
            "cover too small to split ({}x{})",
            width, height
        )));
    }

    Ok(image.crop_imm(left, 0, width - left, height))
}

/// Extension of the cover URL's path with its leading dot, `.jpg` when absent
pub fn cover_extension(cover_url: &str) -> String {
    let path = match Url::parse(cover_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => cover_url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    /// Left half red, right half blue, split after `ceil(width / 2)`
    fn two_tone_png(width: u32, height: u32) -> Vec<u8> {
        let split = width.div_ceil(2);
        let img = RgbImage::from_fn(width, height, |x, _| if x < split { RED } else { BLUE });

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_cover_extension() {
        assert_eq!(cover_extension("https://c.example.com/covers/ab/abc.jpg"), ".jpg");
        assert_eq!(cover_extension("https://c.example.com/a/b.PNG?v=2"), ".png");
        assert_eq!(cover_extension("https://c.example.com/a/noext"), ".jpg");
        assert_eq!(cover_extension(""), ".jpg");
    }

    #[test]
    fn test_split_even_width() {
        let poster = split_cover(&two_tone_png(8, 3)).unwrap();

        assert_eq!(poster.width(), 4);
        assert_eq!(poster.height(), 3);
        assert_eq!(poster.to_rgb8().get_pixel(0, 0), &BLUE);
    }

    #[test]
    fn test_split_odd_width_drops_middle_column() {
        let poster = split_cover(&two_tone_png(5, 2)).unwrap();

        assert_eq!(poster.width(), 2);
        assert!(poster.to_rgb8().pixels().all(|p| *p == BLUE));
    }

    #[test]
    fn test_split_rejects_garbage() {
        assert!(matches!(split_cover(b"not an image"), Err(ArtifactError::Image(_))));
    }

    #[test]
    fn test_split_rejects_single_column() {
        assert!(matches!(split_cover(&two_tone_png(1, 4)), Err(ArtifactError::Image(_))));
    }

    #[test]
    fn test_save_covers_writes_both_files() {
        let dir = tempdir().unwrap();
        let bytes = two_tone_png(6, 2);

        save_covers(&bytes, "https://c.example.com/x/cover.png", dir.path()).unwrap();

        let fanart = fs::read(dir.path().join("fanart.png")).unwrap();
        assert_eq!(fanart, bytes);

        let poster = image::open(dir.path().join("poster.png")).unwrap();
        assert_eq!(poster.width(), 3);
    }

    #[test]
    fn test_save_covers_defaults_to_jpeg() {
        let dir = tempdir().unwrap();

        save_covers(&two_tone_png(6, 2), "https://c.example.com/x/cover", dir.path()).unwrap();

        assert!(dir.path().join("fanart.jpg").exists());
        let poster = image::open(dir.path().join("poster.jpg")).unwrap();
        assert_eq!(poster.width(), 3);
    }

    #[test]
    fn test_rejects_non_http_url() {
        let downloader = CoverDownloader::new(1000, "test").unwrap();
        let dir = tempdir().unwrap();

        let result = downloader.download_and_save_covers("file:///etc/passwd", dir.path());
        assert!(matches!(result, Err(ArtifactError::InvalidCoverUrl(_))));

        let result = downloader.download_and_save_covers("not a url", dir.path());
        assert!(matches!(result, Err(ArtifactError::InvalidCoverUrl(_))));
    }
}
