//! Grid wire protocol
//!
//! This module defines the messages exchanged between the master and worker
//! nodes. There are two independent exchanges:
//!
//! - **Discovery** over UDP: literal text probe and acknowledgement
//! - **Task dispatch** over TCP: fixed-size binary records
//!
//! # Message Flow
//!
//! ```text
//! Master                          Worker
//!   |                               |
//!   |-- "DISCOVER" (UDP bcast) ---->|  discovery port
//!   |<------- "AVAILABLE" (UDP) ----|
//!   |                               |
//!   |== connect (TCP) =============>|  task port
//!   |-- TASK(start, end, step) ---->|
//!   |<------------- RESULT(value) --|
//!   |== close ======================|
//! ```
//!
//! # Record Layout
//!
//! All numeric fields are IEEE-754 doubles in network byte order:
//!
//! ```text
//! TASK:   [8 bytes: start][8 bytes: end][8 bytes: step]   = 24 bytes
//! RESULT: [8 bytes: value]                                =  8 bytes
//! ```
//!
//! There is no length prefix or version field; both sides rely on the fixed
//! record sizes.

use crate::workload::Task;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Payload of the discovery probe
pub const DISCOVER_PROBE: &[u8] = b"DISCOVER";

/// Payload a worker answers a probe with
pub const AVAILABLE_ACK: &[u8] = b"AVAILABLE";

/// Size of an encoded task record
pub const TASK_RECORD_LEN: usize = 24;

/// Size of an encoded result record
pub const RESULT_RECORD_LEN: usize = 8;

/// Largest datagram either side reads during discovery
pub const MAX_DATAGRAM_LEN: usize = 256;

/// Encode a task as `start, end, step`
pub fn encode_task(task: &Task) -> [u8; TASK_RECORD_LEN] {
    let mut buf = [0u8; TASK_RECORD_LEN];
    buf[0..8].copy_from_slice(&task.start.to_be_bytes());
    buf[8..16].copy_from_slice(&task.end.to_be_bytes());
    buf[16..24].copy_from_slice(&task.step.to_be_bytes());
    buf
}

/// Decode a task record
pub fn decode_task(buf: &[u8; TASK_RECORD_LEN]) -> Task {
    Task {
        start: read_f64(&buf[0..8]),
        end: read_f64(&buf[8..16]),
        step: read_f64(&buf[16..24]),
    }
}

/// Encode a result value
pub fn encode_result(value: f64) -> [u8; RESULT_RECORD_LEN] {
    value.to_be_bytes()
}

/// Decode a result record
pub fn decode_result(buf: &[u8; RESULT_RECORD_LEN]) -> f64 {
    f64::from_be_bytes(*buf)
}

fn read_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    f64::from_be_bytes(raw)
}

/// Whether a datagram is a discovery probe
pub fn is_probe(payload: &[u8]) -> bool {
    payload == DISCOVER_PROBE
}

/// Read exactly one task record from a stream
///
/// A stream that closes before 24 bytes arrive fails with
/// `ErrorKind::UnexpectedEof`.
pub async fn read_task<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<Task> {
    let mut buf = [0u8; TASK_RECORD_LEN];
    stream.read_exact(&mut buf).await?;
    Ok(decode_task(&buf))
}

/// Write one task record and flush
pub async fn write_task<W: AsyncWrite + Unpin>(stream: &mut W, task: &Task) -> std::io::Result<()> {
    stream.write_all(&encode_task(task)).await?;
    stream.flush().await
}

/// Read exactly one result record from a stream
pub async fn read_result<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<f64> {
    let mut buf = [0u8; RESULT_RECORD_LEN];
    stream.read_exact(&mut buf).await?;
    Ok(decode_result(&buf))
}

/// Write one result record and flush
pub async fn write_result<W: AsyncWrite + Unpin>(stream: &mut W, value: f64) -> std::io::Result<()> {
    stream.write_all(&encode_result(value)).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_layout_is_big_endian() {
        let bytes = encode_task(&Task::new(1.0, 2.0, 0.5));

        assert_eq!(bytes.len(), TASK_RECORD_LEN);
        assert_eq!(&bytes[0..8], &[0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &[0x40, 0x00, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[16..24], &[0x3f, 0xe0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_task_field_order() {
        let mut bytes = [0u8; TASK_RECORD_LEN];
        bytes[0..8].copy_from_slice(&(-3.25f64).to_be_bytes());
        bytes[8..16].copy_from_slice(&7.0f64.to_be_bytes());
        bytes[16..24].copy_from_slice(&0.001f64.to_be_bytes());

        assert_eq!(decode_task(&bytes), Task::new(-3.25, 7.0, 0.001));
    }

    #[test]
    fn test_result_layout() {
        assert_eq!(encode_result(1.375), [0x3f, 0xf6, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode_result(&[0x40, 0x35, 0x55, 0x55, 0x55, 0x55, 0x55, 0x55]), 64.0 / 3.0);
    }

    #[test]
    fn test_is_probe() {
        assert!(is_probe(b"DISCOVER"));
        assert!(!is_probe(b"DISCOVER\0"));
        assert!(!is_probe(b"discover"));
        assert!(!is_probe(b"AVAILABLE"));
        assert!(!is_probe(b""));
    }

    #[tokio::test]
    async fn test_stream_helpers() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_task(&mut client, &Task::new(0.0, 1.0, 0.25)).await.unwrap();
        let task = read_task(&mut server).await.unwrap();
        assert_eq!(task, Task::new(0.0, 1.0, 0.25));

        write_result(&mut server, 0.21875).await.unwrap();
        assert_eq!(read_result(&mut client).await.unwrap(), 0.21875);
    }

    #[tokio::test]
    async fn test_short_task_record_is_eof() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&[0u8; 10]).await.unwrap();
        drop(client);

        let err = read_task(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
