//! Media inspection: structural validity and dimensions.
//!
//! Images are decoded with the `image` crate. Videos are probed with
//! `ffprobe`. Any failure, including a missing tool, reports `valid = false`.

use async_trait::async_trait;
use image::{GenericImageView, ImageReader};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::ToolsConfig;
use crate::error::PipelineError;
use crate::types::{Dimensions, MediaKind};

/// What the inspector learned about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inspection {
    /// File is structurally decodable
    pub valid: bool,

    /// Pixel or frame size, when known
    pub dimensions: Option<Dimensions>,

    /// Videos only: whether the container holds a video stream.
    /// `None` means the metadata could not be read.
    pub has_video_stream: Option<bool>,

    /// Why the file was found invalid
    pub diagnostic: Option<String>,
}

impl Inspection {
    pub fn invalid(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: false,
            dimensions: None,
            has_video_stream: None,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn image(dimensions: Option<Dimensions>) -> Self {
        Self {
            valid: true,
            dimensions,
            has_video_stream: None,
            diagnostic: None,
        }
    }

    pub fn video(dimensions: Option<Dimensions>, has_video_stream: Option<bool>) -> Self {
        Self {
            valid: true,
            dimensions,
            has_video_stream,
            diagnostic: None,
        }
    }
}

/// Reports whether a file is valid and how large its frames are.
///
/// Implementations must never panic or return an error: every failure is
/// an `Inspection` with `valid = false`. Callers bound each call with a
/// timeout.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn inspect(&self, path: &Path, kind: MediaKind) -> Inspection;
}

/// Default inspector backed by the `image` crate and `ffprobe`.
pub struct ProbeInspector {
    ffprobe: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl ProbeInspector {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            ffprobe: tools.ffprobe.clone(),
        }
    }

    async fn inspect_image(&self, path: &Path) -> Inspection {
        let path_owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || Self::inspect_image_sync(&path_owned)).await {
            Ok(inspection) => inspection,
            Err(e) => Inspection::invalid(format!("Task join error: {e}")),
        }
    }

    /// Decode the image fully. Formats the decoder cannot read are accepted
    /// on a recognizable container signature alone, without dimensions.
    fn inspect_image_sync(path: &Path) -> Inspection {
        let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
            Ok(reader) => reader,
            Err(e) => return Inspection::invalid(format!("Cannot open file: {e}")),
        };

        match reader.format() {
            Some(format) if format.reading_enabled() => match reader.decode() {
                Ok(image) => {
                    let (width, height) = image.dimensions();
                    Inspection::image(Some(Dimensions::new(width, height)))
                }
                Err(e) => Inspection::invalid(e.to_string()),
            },
            _ => match read_header(path) {
                Ok((header, n)) if has_image_signature(&header, n) => Inspection::image(None),
                Ok(_) => Inspection::invalid("Unrecognized image format (invalid magic bytes)"),
                Err(e) => Inspection::invalid(format!("Cannot read header: {e}")),
            },
        }
    }

    async fn inspect_video(&self, path: &Path) -> Inspection {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => return Inspection::invalid(format!("Failed to run {}: {e}", self.ffprobe)),
        };
        if !output.status.success() {
            return Inspection::invalid(format!("ffprobe exited with {}", output.status));
        }

        match serde_json::from_slice::<ProbeOutput>(&output.stdout) {
            Ok(probe) => {
                let (dimensions, has_stream) = first_video_stream(&probe);
                Inspection::video(dimensions, Some(has_stream))
            }
            Err(e) => {
                tracing::debug!("Unparseable ffprobe output for {:?}: {}", path, e);
                Inspection::video(None, None)
            }
        }
    }
}

#[async_trait]
impl MediaInspector for ProbeInspector {
    async fn inspect(&self, path: &Path, kind: MediaKind) -> Inspection {
        if !path.is_file() {
            let missing = PipelineError::FileNotFound(path.to_path_buf());
            return Inspection::invalid(missing.to_string());
        }
        match kind {
            MediaKind::Image => self.inspect_image(path).await,
            MediaKind::Video => self.inspect_video(path).await,
        }
    }
}

/// Dimensions of the first stream classified as video.
fn first_video_stream(probe: &ProbeOutput) -> (Option<Dimensions>, bool) {
    match probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
    {
        Some(stream) => (
            Some(Dimensions::new(
                stream.width.unwrap_or(0),
                stream.height.unwrap_or(0),
            )),
            true,
        ),
        None => (None, false),
    }
}

fn read_header(path: &Path) -> std::io::Result<([u8; 12], usize)> {
    let mut file = std::fs::File::open(path)?;
    let mut header = [0u8; 12];
    let mut filled = 0;
    while filled < header.len() {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok((header, filled))
}

/// Check if the header bytes match a known still-image container.
fn has_image_signature(header: &[u8; 12], bytes_read: usize) -> bool {
    if bytes_read < 4 {
        return false;
    }

    // JPEG: FF D8 FF
    if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
        return true;
    }

    // PNG: 89 50 4E 47
    if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
        return true;
    }

    // WebP: RIFF....WEBP
    if bytes_read >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return true;
    }

    // HEIC/HEIF/AVIF: ftyp box at offset 4 with a still-image brand
    if bytes_read >= 12 && &header[4..8] == b"ftyp" {
        return matches!(
            &header[8..12],
            b"heic" | b"heix" | b"hevc" | b"heim" | b"heis" | b"mif1" | b"msf1" | b"avif"
        );
    }

    false
}
