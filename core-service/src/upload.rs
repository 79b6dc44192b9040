use crate::{CompressionFailure, CompressionResult, SourceAudio};
use bytes::Bytes;

/// Media type used when an original recording carries none.
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// What a host should upload after trying to compress a recording.
#[derive(Debug)]
pub enum UploadAudio {
    /// Compression succeeded.
    Compressed(CompressionResult),
    /// Compression was skipped or failed; upload the recording as recorded.
    Original {
        source: SourceAudio,
        /// Why compression did not produce a result. `None` when it was
        /// never attempted.
        reason: Option<CompressionFailure>,
    },
}

impl UploadAudio {
    pub(crate) fn original(source: SourceAudio, reason: Option<CompressionFailure>) -> Self {
        Self::Original { source, reason }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed(_))
    }

    pub fn data(&self) -> &Bytes {
        match self {
            Self::Compressed(result) => &result.data,
            Self::Original { source, .. } => &source.data,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Self::Compressed(result) => &result.file_name,
            Self::Original { source, .. } => &source.file_name,
        }
    }

    pub fn media_type(&self) -> &str {
        match self {
            Self::Compressed(result) => result.media_type,
            Self::Original { source, .. } => {
                source.media_type.as_deref().unwrap_or(FALLBACK_MEDIA_TYPE)
            }
        }
    }

    /// The failure that forced the original to be uploaded, if any.
    pub fn failure(&self) -> Option<&CompressionFailure> {
        match self {
            Self::Compressed(_) => None,
            Self::Original { reason, .. } => reason.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_keeps_source_identity() {
        let upload = UploadAudio::original(
            SourceAudio::new(vec![1u8, 2, 3], "part1.webm").with_media_type("audio/webm"),
            None,
        );

        assert!(!upload.is_compressed());
        assert_eq!(upload.file_name(), "part1.webm");
        assert_eq!(upload.media_type(), "audio/webm");
        assert_eq!(upload.data().as_ref(), &[1, 2, 3]);
        assert!(upload.failure().is_none());
    }

    #[test]
    fn test_original_without_media_type() {
        let upload = UploadAudio::original(SourceAudio::new(vec![0u8], "blob"), None);
        assert_eq!(upload.media_type(), FALLBACK_MEDIA_TYPE);
    }

    #[test]
    fn test_compressed_reports_mp3() {
        let upload = UploadAudio::Compressed(CompressionResult::mp3(
            Bytes::from_static(&[0xFF, 0xFB]),
            "part1.mp3".to_string(),
        ));

        assert!(upload.is_compressed());
        assert_eq!(upload.media_type(), "audio/mpeg");
        assert_eq!(upload.file_name(), "part1.mp3");
    }
}
