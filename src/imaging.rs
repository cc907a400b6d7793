//! Image Decoder
//!
//! Turns the two ways a soil photo can reach `/predict` into the classifier's
//! input tensor:
//! - `ImageInput::UploadedFile`: a multipart file, saved under the uploads
//!   directory and decoded from disk
//! - `ImageInput::InlineImageData`: a `data:image/...;base64,` URI produced by
//!   the in-browser camera capture
//!
//! Both go through `to_tensor`, so the classifier never sees where an image
//! came from.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageReader};
use thiserror::Error;

/// Square input resolution expected by the MobileNet classifier
pub const INPUT_SIZE: u32 = 224;

/// RGB channels (alpha is dropped)
pub const CHANNELS: usize = 3;

/// Error type for image decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image payload is empty")]
    EmptyPayload,

    #[error("invalid upload file name: {0:?}")]
    InvalidFileName(String),

    #[error("invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("upload I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decoding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Where a soil image came from, resolved once per request.
#[derive(Debug, Clone)]
pub enum ImageInput {
    UploadedFile { file_name: String, bytes: Vec<u8> },
    InlineImageData(String),
}

/// Classifier input: NHWC `[1, 224, 224, 3]`, values scaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    pub const SHAPE: [usize; 4] = [1, INPUT_SIZE as usize, INPUT_SIZE as usize, CHANNELS];

    pub fn shape(&self) -> [usize; 4] {
        Self::SHAPE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// A decoded image plus the stored file name, if it came from an upload.
#[derive(Debug)]
pub struct PreparedImage {
    pub tensor: ImageTensor,
    pub uploaded_file: Option<String>,
}

/// Server-local directory that uploaded images are written to.
///
/// Files are keyed by the client-supplied name, so two uploads with the same
/// name overwrite each other.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the uploads directory if it does not exist.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Write `bytes` under the final component of `file_name`.
    ///
    /// Returns the stored name and its full path.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(String, PathBuf), DecodeError> {
        let name = sanitize_file_name(file_name)?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Saved upload {} ({} bytes)", path.display(), bytes.len());
        Ok((name, path))
    }
}

/// Longest file name common filesystems accept, in bytes
const MAX_FILE_NAME_BYTES: usize = 255;

/// Keep only the last path segment of a client file name.
///
/// Browsers on Windows may send a full `C:\...` path.
fn sanitize_file_name(raw: &str) -> Result<String, DecodeError> {
    let name = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty()
        || name == "."
        || name == ".."
        || name.len() > MAX_FILE_NAME_BYTES
        || name.chars().any(char::is_control)
    {
        return Err(DecodeError::InvalidFileName(raw.to_string()));
    }
    Ok(name.to_string())
}

/// Decode either input variant into a tensor.
///
/// Uploaded files are persisted before decoding; pixel work runs on the
/// blocking pool.
pub async fn prepare(input: ImageInput, store: &UploadStore) -> Result<PreparedImage, DecodeError> {
    match input {
        ImageInput::UploadedFile { file_name, bytes } => {
            if bytes.is_empty() {
                return Err(DecodeError::EmptyPayload);
            }
            let (name, path) = store.save(&file_name, &bytes).await?;
            let tensor = tokio::task::spawn_blocking(move || decode_image_file(&path)).await??;
            Ok(PreparedImage {
                tensor,
                uploaded_file: Some(name),
            })
        }
        ImageInput::InlineImageData(data) => {
            let tensor = tokio::task::spawn_blocking(move || decode_inline_image(&data)).await??;
            Ok(PreparedImage {
                tensor,
                uploaded_file: None,
            })
        }
    }
}

/// Decode an image file from disk, sniffing the format from its contents.
pub fn decode_image_file(path: &Path) -> Result<ImageTensor, DecodeError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(to_tensor(&image))
}

/// Decode a base64 data URI (or a bare base64 payload).
pub fn decode_inline_image(data: &str) -> Result<ImageTensor, DecodeError> {
    let payload = strip_data_uri_prefix(data);
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let bytes = general_purpose::STANDARD.decode(payload)?;
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    Ok(to_tensor(&image))
}

/// Drop everything up to the first comma of a `data:` URI.
fn strip_data_uri_prefix(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, payload)) => payload.trim(),
        None => data.trim(),
    }
}

/// Resize to 224x224 RGB and scale to `[0, 1]` in NHWC order.
pub fn to_tensor(image: &DynamicImage) -> ImageTensor {
    let rgb = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    // RgbImage stores rows of interleaved RGB, which is already HWC
    let data = rgb.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    ImageTensor { data }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 5 % 256) as u8, (y * 7 % 256) as u8, 200, 128])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(bytes))
    }

    fn assert_normalized(tensor: &ImageTensor) {
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        assert_eq!(tensor.as_slice().len(), 224 * 224 * 3);
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_inline_image_produces_normalized_tensor() {
        let tensor = decode_inline_image(&data_uri(&sample_png(50, 30))).unwrap();
        assert_normalized(&tensor);
    }

    #[test]
    fn test_inline_image_accepts_bare_base64() {
        let bare = general_purpose::STANDARD.encode(sample_png(8, 8));
        let tensor = decode_inline_image(&bare).unwrap();
        assert_normalized(&tensor);
    }

    #[test]
    fn test_constant_image_scales_channels() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(10, 10, image::Rgb([255, 0, 51])));
        let tensor = to_tensor(&image);
        let px = &tensor.as_slice()[..3];
        approx::assert_abs_diff_eq!(px[0], 1.0, epsilon = 0.005);
        approx::assert_abs_diff_eq!(px[1], 0.0, epsilon = 0.005);
        approx::assert_abs_diff_eq!(px[2], 0.2, epsilon = 0.005);
    }

    #[test]
    fn test_inline_image_errors_are_distinct() {
        assert!(matches!(decode_inline_image("data:image/png;base64,"), Err(DecodeError::EmptyPayload)));
        assert!(matches!(decode_inline_image("data:image/png;base64,@@@"), Err(DecodeError::InvalidBase64(_))));

        let not_an_image = general_purpose::STANDARD.encode(b"definitely not pixels");
        assert!(matches!(decode_inline_image(&not_an_image), Err(DecodeError::Image(_))));
    }

    #[test]
    fn test_strip_data_uri_prefix() {
        assert_eq!(strip_data_uri_prefix("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri_prefix(" QUJD "), "QUJD");
    }

    #[test]
    fn test_sanitize_file_name_keeps_last_segment() {
        assert_eq!(sanitize_file_name("soil.jpg").unwrap(), "soil.jpg");
        assert_eq!(sanitize_file_name("../../etc/soil.png").unwrap(), "soil.png");
        assert_eq!(sanitize_file_name(r"C:\Users\me\soil.png").unwrap(), "soil.png");
        assert!(sanitize_file_name("").is_err());
        assert!(sanitize_file_name("uploads/..").is_err());
    }

    #[test]
    fn test_sanitize_file_name_rejects_unstorable_names() {
        let long_name = format!("{}.png", "a".repeat(300));
        assert!(matches!(
            sanitize_file_name(&long_name),
            Err(DecodeError::InvalidFileName(_))
        ));
        assert!(sanitize_file_name("soil\0.png").is_err());
        assert!(sanitize_file_name("soil\n.png").is_err());

        let longest = format!("{}.png", "a".repeat(251));
        assert_eq!(sanitize_file_name(&longest).unwrap(), longest);
    }

    #[tokio::test]
    async fn test_both_variants_produce_identical_tensors() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let png = sample_png(64, 48);

        let uploaded = prepare(
            ImageInput::UploadedFile {
                file_name: "field.png".to_string(),
                bytes: png.clone(),
            },
            &store,
        )
        .await
        .unwrap();
        let inline = prepare(ImageInput::InlineImageData(data_uri(&png)), &store)
            .await
            .unwrap();

        assert_normalized(&uploaded.tensor);
        assert_eq!(uploaded.tensor, inline.tensor);
        assert_eq!(uploaded.uploaded_file.as_deref(), Some("field.png"));
        assert!(inline.uploaded_file.is_none());
        assert!(dir.path().join("field.png").exists());
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected_before_saving() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let err = prepare(
            ImageInput::UploadedFile {
                file_name: "empty.png".to_string(),
                bytes: Vec::new(),
            },
            &store,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DecodeError::EmptyPayload));
        assert!(!dir.path().join("empty.png").exists());
    }

    #[tokio::test]
    async fn test_corrupt_upload_reports_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let err = prepare(
            ImageInput::UploadedFile {
                file_name: "broken.jpg".to_string(),
                bytes: b"not a jpeg".to_vec(),
            },
            &store,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DecodeError::Image(_)));
    }
}
