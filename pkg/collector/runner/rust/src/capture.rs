// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::borrow::Cow;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Default per-stream capture limit (1 MiB).
pub const DEFAULT_CAPTURE_LIMIT: usize = 1 << 20;

const READ_CHUNK: usize = 8192;

/// Bounded append-only buffer for one process stream. Bytes past the limit
/// are discarded but counted, so truncation is always detectable.
#[derive(Debug)]
pub struct CaptureBuffer {
    data: Vec<u8>,
    limit: usize,
    discarded: u64,
}

impl CaptureBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            discarded: 0,
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        let room = self.limit.saturating_sub(self.data.len());
        if bytes.len() <= room {
            self.data.extend_from_slice(bytes);
        } else {
            self.data.extend_from_slice(&bytes[..room]);
            self.discarded += (bytes.len() - room) as u64;
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_captured(self) -> Captured {
        Captured {
            truncated: self.discarded > 0,
            discarded: self.discarded,
            bytes: self.data,
        }
    }
}

/// Everything captured from one stream once it closed.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub truncated: bool,
    pub discarded: u64,
}

impl Captured {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Concurrent drains of a child's stdout and stderr.
///
/// Each stream is drained by its own task that exclusively owns its buffer,
/// so appends never contend; the drains start the moment the child is spawned
/// to keep the OS pipe buffers from filling up while the child writes.
pub struct OutputCapture {
    stdout: JoinHandle<CaptureBuffer>,
    stderr: JoinHandle<CaptureBuffer>,
}

impl OutputCapture {
    pub fn start<O, E>(stdout: O, stderr: E, limit: usize) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            stdout: tokio::spawn(drain(stdout, CaptureBuffer::new(limit))),
            stderr: tokio::spawn(drain(stderr, CaptureBuffer::new(limit))),
        }
    }

    /// Wait for both streams to close and hand back what was captured.
    pub async fn finalize(self) -> (Captured, Captured) {
        let stdout = self.stdout.await.unwrap_or_else(|_| CaptureBuffer::new(0));
        let stderr = self.stderr.await.unwrap_or_else(|_| CaptureBuffer::new(0));
        (stdout.into_captured(), stderr.into_captured())
    }
}

/// Read `reader` to end-of-stream into `buf`. Read errors end the drain;
/// whatever was captured up to that point is kept.
async fn drain<R: AsyncRead + Unpin>(mut reader: R, mut buf: CaptureBuffer) -> CaptureBuffer {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.write(&chunk[..n]),
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_under_limit() {
        let mut buf = CaptureBuffer::new(16);
        buf.write(b"hello");
        buf.write(b" world");
        let captured = buf.into_captured();
        assert_eq!(captured.bytes, b"hello world");
        assert!(!captured.truncated);
        assert_eq!(captured.discarded, 0);
    }

    #[test]
    fn test_write_beyond_limit_truncates() {
        let mut buf = CaptureBuffer::new(8);
        buf.write(b"0123456789");
        buf.write(b"abcdef");
        assert_eq!(buf.len(), 8);
        let captured = buf.into_captured();
        assert_eq!(captured.bytes, b"01234567");
        assert!(captured.truncated);
        assert_eq!(captured.discarded, 8);
    }

    #[test]
    fn test_write_exactly_at_limit() {
        let mut buf = CaptureBuffer::new(4);
        buf.write(b"abcd");
        let captured = buf.into_captured();
        assert_eq!(captured.bytes, b"abcd");
        assert!(!captured.truncated);
    }

    #[test]
    fn test_zero_limit_discards_everything() {
        let mut buf = CaptureBuffer::new(0);
        buf.write(b"abc");
        let captured = buf.into_captured();
        assert!(captured.bytes.is_empty());
        assert!(captured.truncated);
        assert_eq!(captured.discarded, 3);
    }

    #[test]
    fn test_captured_text_lossy() {
        let mut buf = CaptureBuffer::new(16);
        buf.write(&[b'o', b'k', 0xff]);
        let captured = buf.into_captured();
        assert!(captured.text().starts_with("ok"));
    }

    #[tokio::test]
    async fn test_drain_reads_to_eof() {
        let data: &[u8] = b"line one\nline two\n";
        let buf = drain(data, CaptureBuffer::new(64)).await;
        let captured = buf.into_captured();
        assert_eq!(captured.bytes, data);
        assert!(!captured.truncated);
    }

    #[tokio::test]
    async fn test_drain_bounded_memory() {
        // 1 MiB of input into a 1 KiB buffer: memory stays bounded and the
        // overflow is accounted for.
        let data = vec![b'x'; 1 << 20];
        let buf = drain(data.as_slice(), CaptureBuffer::new(1024)).await;
        assert_eq!(buf.len(), 1024);
        let captured = buf.into_captured();
        assert!(captured.truncated);
        assert_eq!(captured.discarded, (1 << 20) - 1024);
    }

    #[tokio::test]
    async fn test_output_capture_finalize() {
        let out: &[u8] = b"stdout data";
        let err: &[u8] = b"stderr data";
        let capture = OutputCapture::start(out, err, 64);
        let (stdout, stderr) = capture.finalize().await;
        assert_eq!(stdout.bytes, b"stdout data");
        assert_eq!(stderr.bytes, b"stderr data");
    }
}
