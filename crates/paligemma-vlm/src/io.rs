use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::Duration,
};

use image::DynamicImage;

use crate::error::VlmError;

/// Where the input image of an inference call comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// A remote image fetched over http(s).
    Url(String),
    /// An image stored on the local filesystem.
    Path(PathBuf),
}

impl ImageSource {
    /// Materialize the image, downloading it with `fetcher` for urls.
    pub fn load(&self, fetcher: &ImageFetcher) -> Result<DynamicImage, VlmError> {
        match self {
            ImageSource::Url(url) => fetcher.fetch(url),
            ImageSource::Path(path) => load_image_path(path),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageSource::Url(url) => write!(f, "{url}"),
            ImageSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Reads an image from the given file path.
///
/// The format is guessed from the file content, so uploads saved with a
/// misleading extension still decode.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
pub fn load_image_path(file_path: impl AsRef<Path>) -> Result<DynamicImage, VlmError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(VlmError::ImageNotFound(file_path.to_path_buf()));
    }

    let image = image::ImageReader::open(file_path)?
        .with_guessed_format()?
        .decode()?;

    Ok(image)
}

/// Decodes an image from an in-memory buffer.
pub fn load_image_bytes(bytes: &[u8]) -> Result<DynamicImage, VlmError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Downloads images over http(s).
///
/// The blocking client is built on the first fetch and shared by all clones,
/// so [`ImageFetcher::fetch`] must not run on an async worker thread.
#[derive(Clone, Debug)]
pub struct ImageFetcher {
    timeout: Duration,
    client: Arc<OnceLock<reqwest::blocking::Client>>,
}

impl Default for ImageFetcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl ImageFetcher {
    /// Default timeout for a single image download.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new fetcher with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: Arc::new(OnceLock::new()),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, VlmError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        // a concurrent first fetch may have won the race, keep its client
        Ok(self.client.get_or_init(|| client))
    }

    /// Fetch and decode the image at `url`.
    pub fn fetch(&self, url: &str) -> Result<DynamicImage, VlmError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| VlmError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VlmError::InvalidUrl(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let client = self.client()?;

        log::debug!("Downloading image from {url}");
        let response = client.get(parsed).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(VlmError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes()?;
        load_image_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([255, 0, 0]));
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Png)
            .expect("failed to encode png");
        buf.into_inner()
    }

    #[test]
    fn load_from_path_guesses_format() -> Result<(), VlmError> {
        let dir = tempfile::tempdir()?;
        // png content behind a jpg extension
        let path = dir.path().join("input.jpg");
        std::fs::write(&path, png_bytes(8, 4))?;

        let image = load_image_path(&path)?;
        assert_eq!(image.width(), 8);
        assert_eq!(image.height(), 4);
        Ok(())
    }

    #[test]
    fn load_from_missing_path() {
        let res = load_image_path("/definitely/not/here.png");
        assert!(matches!(res, Err(VlmError::ImageNotFound(_))));
    }

    #[test]
    fn load_from_garbage_bytes() {
        let res = load_image_bytes(b"not an image");
        assert!(matches!(res, Err(VlmError::ImageDecodeError(_))));
    }

    #[test]
    fn source_load_dispatches() -> Result<(), VlmError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("a.png");
        std::fs::write(&path, png_bytes(2, 2))?;

        let fetcher = ImageFetcher::default();
        assert_eq!(ImageSource::Path(path).load(&fetcher)?.width(), 2);
        assert!(matches!(
            ImageSource::Url("nope".into()).load(&fetcher),
            Err(VlmError::InvalidUrl(_))
        ));
        Ok(())
    }

    #[test]
    fn fetch_rejects_malformed_url() -> Result<(), VlmError> {
        let fetcher = ImageFetcher::default();
        assert!(matches!(
            fetcher.fetch("not a url"),
            Err(VlmError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.fetch("file:///etc/passwd"),
            Err(VlmError::InvalidUrl(_))
        ));
        Ok(())
    }

    #[test]
    fn fetch_decodes_remote_image() -> Result<(), VlmError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/cat.png");
            then.status(200)
                .header("content-type", "image/png")
                .body(png_bytes(3, 5));
        });

        let fetcher = ImageFetcher::default();
        let image = fetcher.fetch(&server.url("/cat.png"))?;
        assert_eq!(image.width(), 3);
        assert_eq!(image.height(), 5);

        // clones reuse the client built by the first fetch
        let clone = fetcher.clone();
        let first = fetcher.client()? as *const reqwest::blocking::Client;
        assert!(std::ptr::eq(first, clone.client()?));
        clone.fetch(&server.url("/cat.png"))?;

        mock.assert_hits(2);
        Ok(())
    }

    #[test]
    fn fetch_reports_http_status() -> Result<(), VlmError> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.png");
            then.status(404);
        });

        let fetcher = ImageFetcher::default();
        let res = fetcher.fetch(&server.url("/missing.png"));
        assert!(matches!(res, Err(VlmError::FetchStatus { status: 404, .. })));
        Ok(())
    }
}
