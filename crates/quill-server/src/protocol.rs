//! Binary upload frame codec.
//!
//! Frame layout: one marker byte, a 2-byte big-endian header length `L`,
//! `L` bytes of UTF-8 JSON (`{name, size, mimeType}`), then the raw file
//! content.

use quill_core::constants::UPLOAD_FRAME_MARKER;
use quill_core::manifest::FileProps;

/// Errors raised decoding an inbound frame. All of them are logged and
/// the frame dropped; the session continues.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// First byte is not the upload marker.
    #[error("not an upload frame: marker byte {0:#04x}")]
    BadMarker(u8),
    /// The frame ends before the declared header (or the prefix itself).
    #[error("truncated frame: need {needed} bytes, got {got}")]
    Truncated {
        /// Bytes the declared layout requires.
        needed: usize,
        /// Bytes actually present.
        got: usize,
    },
    /// The header bytes are not a valid file-properties object.
    #[error("malformed upload header: {0}")]
    Header(#[from] serde_json::Error),
}

/// Decode one binary upload frame into its header and raw content.
pub fn decode_upload_frame(frame: &[u8]) -> Result<(FileProps, Vec<u8>), ProtocolError> {
    if frame.len() < 3 {
        return Err(ProtocolError::Truncated {
            needed: 3,
            got: frame.len(),
        });
    }
    if frame[0] != UPLOAD_FRAME_MARKER {
        return Err(ProtocolError::BadMarker(frame[0]));
    }
    let header_len = usize::from(u16::from_be_bytes([frame[1], frame[2]]));
    let body_start = 3 + header_len;
    if frame.len() < body_start {
        return Err(ProtocolError::Truncated {
            needed: body_start,
            got: frame.len(),
        });
    }
    let header: FileProps = serde_json::from_slice(&frame[3..body_start])?;
    Ok((header, frame[body_start..].to_vec()))
}

/// Encode an upload frame (client side of the codec; used by tests and
/// tooling).
pub fn encode_upload_frame(props: &FileProps, content: &[u8]) -> Vec<u8> {
    let header = serde_json::to_vec(props).unwrap_or_default();
    let mut frame = Vec::with_capacity(3 + header.len() + content.len());
    frame.push(UPLOAD_FRAME_MARKER);
    frame.extend_from_slice(&(header.len() as u16).to_be_bytes());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(content);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn props() -> FileProps {
        FileProps {
            name: "notes.txt".to_string(),
            size: 11,
            mime_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn round_trip() {
        let frame = encode_upload_frame(&props(), b"hello world");
        let (header, content) = decode_upload_frame(&frame).unwrap();
        assert_eq!(header, props());
        assert_eq!(content, b"hello world");
    }

    #[test]
    fn empty_content_is_valid() {
        let frame = encode_upload_frame(&props(), b"");
        let (_, content) = decode_upload_frame(&frame).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn wrong_marker_rejected() {
        let mut frame = encode_upload_frame(&props(), b"x");
        frame[0] = 0x7F;
        assert_matches!(
            decode_upload_frame(&frame),
            Err(ProtocolError::BadMarker(0x7F))
        );
    }

    #[test]
    fn short_prefix_rejected() {
        assert_matches!(
            decode_upload_frame(&[UPLOAD_FRAME_MARKER]),
            Err(ProtocolError::Truncated { needed: 3, got: 1 })
        );
    }

    #[test]
    fn header_length_past_end_rejected() {
        // declares a 1000-byte header on a tiny frame
        let frame = [UPLOAD_FRAME_MARKER, 0x03, 0xE8, b'{'];
        assert_matches!(
            decode_upload_frame(&frame),
            Err(ProtocolError::Truncated { .. })
        );
    }

    #[test]
    fn garbage_header_rejected() {
        let header = b"not json";
        let mut frame = vec![UPLOAD_FRAME_MARKER];
        frame.extend_from_slice(&(header.len() as u16).to_be_bytes());
        frame.extend_from_slice(header);
        assert_matches!(decode_upload_frame(&frame), Err(ProtocolError::Header(_)));
    }

    #[test]
    fn header_length_is_big_endian() {
        let frame = encode_upload_frame(&props(), b"abc");
        let declared = usize::from(u16::from_be_bytes([frame[1], frame[2]]));
        let header = serde_json::to_vec(&props()).unwrap();
        assert_eq!(declared, header.len());
    }
}
