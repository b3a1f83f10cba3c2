use encore_core::constants;
use encore_core::models::MediaKind;
use std::path::Path;

/// Common validation errors for media files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Media file validator
///
/// Runs before any storage write so rejected uploads never touch disk.
pub struct MediaValidator {
    /// `None` means unbounded at this layer (images rely on the transport limit).
    max_file_size: Option<usize>,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(
        max_file_size: Option<usize>,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if let Some(max) = self.max_file_size {
            if size > max {
                return Err(ValidationError::FileTooLarge { size, max });
            }
        }
        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate that the declared Content-Type matches the file extension.
    /// Prevents a payload with a legitimate-looking Content-Type from slipping
    /// through under a mismatched name.
    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        let normalized_content_type = content_type.to_lowercase();

        let expected_content_types: Vec<&str> = match extension.as_str() {
            "jpg" | "jpeg" => vec!["image/jpeg"],
            "png" => vec!["image/png"],
            "gif" => vec!["image/gif"],
            "webp" => vec!["image/webp"],
            "svg" => vec!["image/svg+xml"],
            "ico" => vec!["image/x-icon", "image/vnd.microsoft.icon"],
            "mp4" => vec!["video/mp4"],
            "webm" => vec!["video/webm"],
            "mov" => vec!["video/quicktime"],
            _ => {
                // Unknown extensions fail the individual extension check; no
                // cross-validation to do here.
                tracing::debug!(
                    extension = %extension,
                    content_type = %content_type,
                    "Unknown extension, skipping Content-Type/extension cross-validation"
                );
                return Ok(());
            }
        };

        if !expected_content_types
            .iter()
            .any(|ct| ct == &normalized_content_type)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: format!(
                    "{} (does not match extension '{}'. Expected one of: {})",
                    content_type,
                    extension,
                    expected_content_types.join(", ")
                ),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate every aspect of an upload in fail-fast order.
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_file_size(file_size)?;
        self.validate_content_type(content_type)?;
        self.validate_extension(filename)?;
        self.validate_extension_content_type_match(filename, content_type)?;
        Ok(())
    }
}

/// Create the validator for a media kind: images are unbounded at this layer,
/// videos carry the configured byte ceiling.
pub fn validator_for_kind(kind: MediaKind, video_max_file_size: usize) -> MediaValidator {
    match kind {
        MediaKind::Image => MediaValidator::new(
            None,
            constants::IMAGE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            constants::IMAGE_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
        MediaKind::Video => MediaValidator::new(
            Some(video_max_file_size),
            constants::VIDEO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            constants::VIDEO_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
    }
}
