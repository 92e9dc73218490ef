//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.image_extensions.is_empty()
            && self.processing.video_extensions.is_empty()
        {
            return Err(ConfigError::ValidationError(
                "processing.image_extensions and processing.video_extensions cannot both be empty"
                    .into(),
            ));
        }
        if let Some(ext) = self.processing.image_extensions.iter().find(|ext| {
            self.processing
                .video_extensions
                .iter()
                .any(|v| v.eq_ignore_ascii_case(ext))
        }) {
            return Err(ConfigError::ValidationError(format!(
                "extension '{ext}' is listed as both image and video"
            )));
        }
        if self.limits.max_image_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_bytes must be > 0".into(),
            ));
        }
        if self.limits.max_video_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_video_bytes must be > 0".into(),
            ));
        }

        let timeouts = [
            ("limits.validate_timeout_ms", self.limits.validate_timeout_ms),
            ("limits.quality_timeout_ms", self.limits.quality_timeout_ms),
            (
                "limits.image_convert_timeout_ms",
                self.limits.image_convert_timeout_ms,
            ),
            (
                "limits.video_convert_timeout_ms",
                self.limits.video_convert_timeout_ms,
            ),
            ("limits.hash_timeout_ms", self.limits.hash_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
        }

        if !(0.0..=100.0).contains(&self.dedup.threshold_percent) {
            return Err(ConfigError::ValidationError(
                "dedup.threshold_percent must be between 0 and 100".into(),
            ));
        }
        if self.dedup.hash_size == 0 {
            return Err(ConfigError::ValidationError(
                "dedup.hash_size must be > 0".into(),
            ));
        }
        if self.organize.photos_dir.trim().is_empty() || self.organize.videos_dir.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "organize.photos_dir and organize.videos_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}
