//! Media processing: upload validation, image compression and thumbnailing,
//! ffmpeg video transcoding, and the replace-original commit helper.

pub mod image;
pub mod swap;
pub mod validator;
pub mod video;

pub use crate::image::{CompressedImage, ImageCompressor, ImageOptions};
pub use crate::swap::commit_replacement;
pub use crate::validator::{validator_for_kind, MediaValidator, ValidationError};
pub use crate::video::{FfmpegTranscoder, TranscodeError};
