//! # RelayMQ Protocol Module
//!
//! Wire framing for the broker: every message travels as a 4-byte big-endian
//! unsigned length prefix followed by exactly that many payload bytes. The
//! payload itself is opaque to the broker and is never inspected.
//!
//! Two entry points over the same format:
//!
//! - [`read_frame`] / [`write_frame`] - async free functions over any
//!   `AsyncRead`/`AsyncWrite`, used by the broker's connection loops
//! - [`FrameCodec`] - a `tokio_util` [`Decoder`]/[`Encoder`] pair for
//!   `Framed`-based clients and tests
//!
//! Declared lengths above [`MAX_FRAME_SIZE`] (1 MiB) are rejected before any
//! body byte is read; this is an application policy, not a wire-format limit.
//!
//! [`Decoder`]: tokio_util::codec::Decoder
//! [`Encoder`]: tokio_util::codec::Encoder

pub mod framing;

pub use framing::{read_frame, write_frame, FrameCodec, FrameError, MAX_FRAME_SIZE};
