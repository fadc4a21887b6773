//! Image attachments: raw bytes plus a declared MIME type.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// MIME type assumed when the file extension is unknown.
const FALLBACK_MIME: &str = "image/jpeg";

/// An image ready to attach to a user turn.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Reads an image file from disk.
    ///
    /// # Details
    /// The MIME type is guessed from the file extension and falls back to
    /// `image/jpeg`, which the chat endpoints accept for most photos.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
        Ok(Self::new(bytes, guess_mime(path)))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Encodes the image as a `data:` URL for the `image_url` content part.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_reads_bytes_and_guesses_png() {
        let mut file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .expect("temp file");
        file.write_all(&[0x89, b'P', b'N', b'G']).expect("write");

        let image = ImageData::load(file.path()).expect("load");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes(), &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn unknown_extension_falls_back_to_jpeg() {
        assert_eq!(guess_mime(Path::new("taj_mahal")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("notes.txt")), "image/jpeg");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ImageData::load("definitely/not/here.jpg").is_err());
    }

    #[test]
    fn data_url_embeds_mime_and_base64() {
        let image = ImageData::new(b"hi".to_vec(), "image/webp");
        assert_eq!(image.data_url(), "data:image/webp;base64,aGk=");
    }
}
