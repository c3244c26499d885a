//! Wire format: length-prefixed bincode v2 frames.
//!
//! Each message on the wire is:
//!   [4 bytes big-endian length][bincode v2 payload]

use bincode::{Decode, Encode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::BusError;

/// Maximum message size (1 MiB). Prevents allocation bombs.
pub const MAX_MESSAGE_SIZE: u32 = 1024 * 1024;

/// Encode a message to a length-prefixed byte vector.
pub fn encode_message<T: Encode>(msg: &T) -> Result<Vec<u8>, BusError> {
    let config = bincode::config::standard();
    let payload = bincode::encode_to_vec(msg, config)
        .map_err(|e| BusError::Serialization(e.to_string()))?;

    let len = u32::try_from(payload.len())
        .map_err(|_| BusError::Serialization("message too large".to_string()))?;

    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode a message from a bincode v2 payload (without the length prefix).
pub fn decode_message<T: Decode<()>>(payload: &[u8]) -> Result<T, BusError> {
    let config = bincode::config::standard();
    let (msg, _) = bincode::decode_from_slice(payload, config)
        .map_err(|e| BusError::Deserialization(e.to_string()))?;
    Ok(msg)
}

/// Write one framed message to an async stream.
pub async fn write_frame<T, W>(writer: &mut W, msg: &T) -> Result<(), BusError>
where
    T: Encode,
    W: AsyncWrite + Unpin,
{
    let buf = encode_message(msg)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message from an async stream.
pub async fn read_frame<T, R>(reader: &mut R) -> Result<T, BusError>
where
    T: Decode<()>,
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader
        .read_exact(&mut len_bytes)
        .await
        .map_err(map_read_error)?;

    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_MESSAGE_SIZE {
        return Err(BusError::Deserialization(format!(
            "frame of {len} bytes exceeds maximum"
        )));
    }

    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(map_read_error)?;

    decode_message(&payload)
}

/// EOF means the peer hung up; anything else is a genuine transport error.
fn map_read_error(e: std::io::Error) -> BusError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        BusError::StreamClosed
    } else {
        BusError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopsink_types::{Request, Response};

    #[test]
    fn frame_carries_length_prefix() {
        let msg = Request::Call {
            method: "LoadModule".to_string(),
        };
        let bytes = encode_message(&msg).unwrap();
        let len = u32::from_be_bytes(bytes[..4].try_into().unwrap());
        assert_eq!(len as usize, bytes.len() - 4);

        let decoded: Request = decode_message(&bytes[4..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn frames_over_a_duplex_stream() {
        let (mut a, mut b) = tokio::io::duplex(256);
        write_frame(&mut a, &Response::Return { success: true })
            .await
            .unwrap();
        let decoded: Response = read_frame(&mut b).await.unwrap();
        assert_eq!(decoded, Response::Return { success: true });
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(16);
        let len = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut a, &len).await.unwrap();
        let result: Result<Response, _> = read_frame(&mut b).await;
        assert!(matches!(result, Err(BusError::Deserialization(_))));
    }

    #[tokio::test]
    async fn closed_stream_reports_stream_closed() {
        let (a, mut b) = tokio::io::duplex(16);
        drop(a);
        let result: Result<Request, _> = read_frame(&mut b).await;
        assert!(matches!(result, Err(BusError::StreamClosed)));
    }

    #[tokio::test]
    async fn read_failure_keeps_the_io_error() {
        struct BrokenReader;

        impl tokio::io::AsyncRead for BrokenReader {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "reset by peer",
                )))
            }
        }

        let mut reader = BrokenReader;
        let result: Result<Request, _> = read_frame(&mut reader).await;
        match result {
            Err(BusError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
