//! Length-prefixed frame encoding and decoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{self, Cursor};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

/// Maximum accepted payload length in bytes (1 MiB). Frames declaring more
/// are rejected before the body is read.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    /// Declared payload length exceeds [`MAX_FRAME_SIZE`].
    #[error("frame of {declared} bytes exceeds maximum of {MAX_FRAME_SIZE}")]
    TooLarge { declared: usize },

    /// The peer closed the stream cleanly at a frame boundary.
    #[error("stream closed")]
    Closed,

    /// The stream ended mid-frame: fewer bytes arrived than declared.
    #[error("truncated frame")]
    Truncated,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Writes `body` to `writer` as one frame: 4-byte big-endian length, then
/// the body. Fails with [`FrameError::TooLarge`] before writing anything if
/// the body exceeds [`MAX_FRAME_SIZE`].
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            declared: body.len(),
        });
    }

    let header = (body.len() as u32).to_be_bytes();
    writer.write_all(&header).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame from `reader`, reusing `scratch` as the body buffer.
///
/// Returns an owned immutable [`Bytes`] carved off the scratch buffer, so
/// callers may hand the payload to shared storage and keep reusing `scratch`
/// for the next frame without aliasing.
///
/// Failure taxonomy: zero bytes at a frame boundary is [`FrameError::Closed`]
/// (the peer finished cleanly); an oversize declared length is
/// [`FrameError::TooLarge`], detected before any body byte is read; a stream
/// that ends mid-header or mid-body is [`FrameError::Truncated`].
pub async fn read_frame<R>(reader: &mut R, scratch: &mut BytesMut) -> Result<Bytes, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return Err(if filled == 0 {
                FrameError::Closed
            } else {
                FrameError::Truncated
            });
        }
        filled += n;
    }

    let declared = u32::from_be_bytes(header) as usize;
    if declared > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge { declared });
    }

    scratch.clear();
    scratch.resize(declared, 0);
    reader.read_exact(&mut scratch[..]).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(e)
        }
    })?;

    Ok(scratch.split_to(declared).freeze())
}

/// Frame codec for `Framed` transports (length-prefixed messages).
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            // Need at least 4 bytes for the length prefix
            return Ok(None);
        }

        // Peek at the declared length without consuming bytes
        let declared = {
            let mut cursor = Cursor::new(src.as_ref());
            cursor.get_u32() as usize
        };

        if declared > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge { declared });
        }

        let total = 4 + declared;
        if src.len() < total {
            // Don't have the full frame yet
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(4);
        Ok(Some(frame.freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge {
                declared: item.len(),
            });
        }

        dst.reserve(4 + item.len());
        dst.put_u32(item.len() as u32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_identity() {
        let payload = b"hello broker".to_vec();
        let mut wire = Vec::new();
        write_frame(&mut wire, &payload).await.unwrap();

        let mut reader = wire.as_slice();
        let mut scratch = BytesMut::new();
        let body = read_frame(&mut reader, &mut scratch).await.unwrap();
        assert_eq!(&body[..], &payload[..]);
    }

    #[tokio::test]
    async fn round_trip_empty_payload() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"").await.unwrap();
        assert_eq!(wire, vec![0, 0, 0, 0]);

        let mut reader = wire.as_slice();
        let mut scratch = BytesMut::new();
        let body = read_frame(&mut reader, &mut scratch).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn oversize_declared_length_fails_before_body_read() {
        // Header declares 2 MiB but no body follows; a body read would hit
        // Truncated, so getting TooLarge proves the check happens first.
        let wire = ((MAX_FRAME_SIZE + 1) as u32).to_be_bytes().to_vec();
        let mut reader = wire.as_slice();
        let mut scratch = BytesMut::new();
        match read_frame(&mut reader, &mut scratch).await {
            Err(FrameError::TooLarge { declared }) => assert_eq!(declared, MAX_FRAME_SIZE + 1),
            other => panic!("expected TooLarge, got {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn oversize_body_rejected_on_write() {
        let payload = vec![0u8; MAX_FRAME_SIZE + 1];
        let mut wire = Vec::new();
        match write_frame(&mut wire, &payload).await {
            Err(FrameError::TooLarge { .. }) => assert!(wire.is_empty()),
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn eof_at_frame_boundary_is_clean_close() {
        let wire: Vec<u8> = Vec::new();
        let mut reader = wire.as_slice();
        let mut scratch = BytesMut::new();
        assert!(matches!(
            read_frame(&mut reader, &mut scratch).await,
            Err(FrameError::Closed)
        ));
    }

    #[tokio::test]
    async fn eof_mid_header_is_truncation() {
        let wire = vec![0u8, 0];
        let mut reader = wire.as_slice();
        let mut scratch = BytesMut::new();
        assert!(matches!(
            read_frame(&mut reader, &mut scratch).await,
            Err(FrameError::Truncated)
        ));
    }

    #[tokio::test]
    async fn eof_mid_body_is_truncation() {
        let mut wire = 10u32.to_be_bytes().to_vec();
        wire.extend_from_slice(b"short");
        let mut reader = wire.as_slice();
        let mut scratch = BytesMut::new();
        assert!(matches!(
            read_frame(&mut reader, &mut scratch).await,
            Err(FrameError::Truncated)
        ));
    }

    #[tokio::test]
    async fn scratch_buffer_reuse_does_not_alias_earlier_frames() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"first").await.unwrap();
        write_frame(&mut wire, b"second").await.unwrap();

        let mut reader = wire.as_slice();
        let mut scratch = BytesMut::new();
        let first = read_frame(&mut reader, &mut scratch).await.unwrap();
        let second = read_frame(&mut reader, &mut scratch).await.unwrap();
        assert_eq!(&first[..], b"first");
        assert_eq!(&second[..], b"second");
    }

    #[test]
    fn codec_decodes_incrementally() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&5u32.to_be_bytes()[..2]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&5u32.to_be_bytes()[2..]);
        buf.extend_from_slice(b"hel");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"lo");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn codec_rejects_oversize_header() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&(2 * 1024 * 1024u32).to_be_bytes());
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::TooLarge { .. })
        ));
    }

    #[test]
    fn codec_encode_matches_free_function_wire_format() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        codec.encode(Bytes::from_static(b"abc"), &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 3, b'a', b'b', b'c']);
    }
}
