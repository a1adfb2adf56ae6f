//! Length-prefixed framing for the TCP transport.
//!
//! Every message travels as one frame:
//!
//! ```text
//! +-------------------+--------------------+
//! | length (4 bytes)  |   payload          |
//! | u32 little-endian |   (length bytes)   |
//! +-------------------+--------------------+
//! ```
//!
//! The prefix counts payload bytes only, not itself. Frames over the
//! configured ceiling are rejected before any payload byte is read, so a
//! hostile prefix cannot trigger a large allocation.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Configuration for the framing layer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum allowed payload size in bytes. Default: 256 KiB.
    pub max_payload_size: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 262_144,
        }
    }
}

/// Errors that can occur while reading or writing frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload size exceeds the configured ceiling.
    #[error("frame of {size} bytes exceeds the {max}-byte limit")]
    Oversized {
        /// The declared or actual payload size.
        size: u32,
        /// The configured ceiling.
        max: u32,
    },

    /// The peer closed the connection mid-frame or between frames.
    #[error("connection closed")]
    Closed,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn map_eof(e: std::io::Error) -> FrameError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::Closed
    } else {
        FrameError::Io(e)
    }
}

/// Read one frame and return its payload.
///
/// Waits until the full frame is available. A clean close between frames
/// surfaces as [`FrameError::Closed`], same as a mid-frame close; the
/// caller treats both as end of stream.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    config: &FrameConfig,
) -> Result<Vec<u8>, FrameError> {
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).await.map_err(map_eof)?;

    let len = u32::from_le_bytes(prefix);
    if len > config.max_payload_size {
        return Err(FrameError::Oversized {
            size: len,
            max: config.max_payload_size,
        });
    }

    let mut payload = vec![0u8; len as usize];
    if len > 0 {
        reader.read_exact(&mut payload).await.map_err(map_eof)?;
    }
    Ok(payload)
}

/// Write one frame: the little-endian length prefix, then the payload.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    payload: &[u8],
    config: &FrameConfig,
) -> Result<(), FrameError> {
    let len = payload.len() as u32;
    if len > config.max_payload_size {
        return Err(FrameError::Oversized {
            size: len,
            max: config.max_payload_size,
        });
    }

    writer.write_all(&len.to_le_bytes()).await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_roundtrip() {
        let (mut client, mut server) = duplex(8192);
        let config = FrameConfig::default();

        write_frame(&mut client, b"hello plaza", &config).await.unwrap();
        let payload = read_frame(&mut server, &config).await.unwrap();
        assert_eq!(payload, b"hello plaza");
    }

    #[tokio::test]
    async fn test_frames_keep_their_boundaries() {
        let (mut client, mut server) = duplex(8192);
        let config = FrameConfig::default();

        for msg in [b"one".as_slice(), b"two", b"three"] {
            write_frame(&mut client, msg, &config).await.unwrap();
        }
        assert_eq!(read_frame(&mut server, &config).await.unwrap(), b"one");
        assert_eq!(read_frame(&mut server, &config).await.unwrap(), b"two");
        assert_eq!(read_frame(&mut server, &config).await.unwrap(), b"three");
    }

    #[tokio::test]
    async fn test_partial_writes_reassemble() {
        // A tiny duplex buffer forces the payload through in pieces.
        let (mut client, mut server) = duplex(8);
        let config = FrameConfig::default();
        let payload = b"a payload noticeably larger than the pipe buffer";

        let write_config = config.clone();
        let writer = tokio::spawn(async move {
            write_frame(&mut client, payload, &write_config).await.unwrap();
        });

        let received = read_frame(&mut server, &config).await.unwrap();
        writer.await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn test_oversized_prefix_rejected_before_payload() {
        let (mut client, mut server) = duplex(8192);
        let config = FrameConfig {
            max_payload_size: 16,
        };

        client.write_all(&4096u32.to_le_bytes()).await.unwrap();
        client.flush().await.unwrap();

        assert!(matches!(
            read_frame(&mut server, &config).await,
            Err(FrameError::Oversized { size: 4096, max: 16 })
        ));
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected_on_write() {
        let (mut client, _server) = duplex(8192);
        let config = FrameConfig {
            max_payload_size: 16,
        };

        let result = write_frame(&mut client, &[0u8; 64], &config).await;
        assert!(matches!(result, Err(FrameError::Oversized { .. })));
    }

    #[tokio::test]
    async fn test_empty_frame_is_valid() {
        let (mut client, mut server) = duplex(8192);
        let config = FrameConfig::default();

        write_frame(&mut client, &[], &config).await.unwrap();
        let payload = read_frame(&mut server, &config).await.unwrap();
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_close_between_frames_reports_closed() {
        let (client, mut server) = duplex(8192);
        drop(client);

        let result = read_frame(&mut server, &FrameConfig::default()).await;
        assert!(matches!(result, Err(FrameError::Closed)));
    }

    #[tokio::test]
    async fn test_close_mid_frame_reports_closed() {
        let (mut client, mut server) = duplex(8192);
        client.write_all(&10u32.to_le_bytes()).await.unwrap();
        client.write_all(b"tru").await.unwrap();
        client.flush().await.unwrap();
        drop(client);

        let result = read_frame(&mut server, &FrameConfig::default()).await;
        assert!(matches!(result, Err(FrameError::Closed)));
    }

    #[tokio::test]
    async fn test_prefix_is_little_endian() {
        let (mut client, mut server) = duplex(8192);
        client.write_all(&5u32.to_le_bytes()).await.unwrap();
        client.write_all(b"plaza").await.unwrap();
        client.flush().await.unwrap();

        let payload = read_frame(&mut server, &FrameConfig::default())
            .await
            .unwrap();
        assert_eq!(payload, b"plaza");
    }
}
