// src/exec/output.rs

//! Output sinks shared by concurrently running steps.
//!
//! Every write to an [`OutputSink`] happens under one mutex and carries a
//! whole line, so output from different processes can interleave line by
//! line but never inside a line.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// How step output is forwarded to the sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Lines are forwarded byte-for-byte.
    #[default]
    Raw,
    /// Each line is tagged with `[worker=<id>,job=<id>] `.
    Prefixed,
}

/// Cloneable, write-serializing handle over any writer.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

impl OutputSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Write `buf` in full and flush, holding the lock for the whole call.
    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut writer = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output sink lock poisoned"))?;
        writer.write_all(buf)?;
        writer.flush()
    }
}

/// In-memory writer whose clones share one buffer.
///
/// Wrap a clone in an [`OutputSink`] and keep another to read back what the
/// steps printed.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        match self.bytes.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A `[k=v,k=v] ` tag put in front of every forwarded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePrefix(String);

impl LinePrefix {
    pub fn with_fields(fields: &[(&str, String)]) -> Self {
        let joined = fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        Self(format!("[{joined}] "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn apply(&self, line: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + line.len() + 1);
        out.extend_from_slice(self.0.as_bytes());
        out.extend_from_slice(line);
        if !line.ends_with(b"\n") {
            out.push(b'\n');
        }
        out
    }
}

/// Stream `reader` into `sink` one line at a time until EOF.
///
/// Without a prefix lines are passed through untouched, including a final
/// line with no terminating newline.
pub async fn copy_lines<R>(reader: R, sink: &OutputSink, prefix: Option<&LinePrefix>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }

        match prefix {
            Some(prefix) => sink.write_all(&prefix.apply(&line))?,
            None => sink.write_all(&line)?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_multiple_lines_verbatim() {
        let buf = SharedBuffer::new();
        let sink = OutputSink::new(buf.clone());
        copy_lines(&b"test1\ntest2\n"[..], &sink, None).await.unwrap();
        assert_eq!(buf.contents(), "test1\ntest2\n");
    }

    #[tokio::test]
    async fn keeps_a_trailing_partial_line() {
        let buf = SharedBuffer::new();
        let sink = OutputSink::new(buf.clone());
        copy_lines(&b"done\nno newline"[..], &sink, None).await.unwrap();
        assert_eq!(buf.contents(), "done\nno newline");
    }

    #[tokio::test]
    async fn prefixes_every_line() {
        let buf = SharedBuffer::new();
        let sink = OutputSink::new(buf.clone());
        let prefix = LinePrefix::with_fields(&[("worker", 1.to_string()), ("job", "build".to_string())]);
        copy_lines(&b"a\nb"[..], &sink, Some(&prefix)).await.unwrap();
        assert_eq!(buf.contents(), "[worker=1,job=build] a\n[worker=1,job=build] b\n");
    }

    #[test]
    fn prefix_renders_fields_in_order() {
        let prefix = LinePrefix::with_fields(&[("worker", 1.to_string()), ("name", "bob".to_string())]);
        assert_eq!(prefix.as_str(), "[worker=1,name=bob] ");
    }

    #[test]
    fn concurrent_writers_never_split_a_line() {
        let buf = SharedBuffer::new();
        let sink = OutputSink::new(buf.clone());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    let line = format!("{}\n", i.to_string().repeat(64));
                    for _ in 0..50 {
                        sink.write_all(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let out = buf.contents();
        assert_eq!(out.lines().count(), 8 * 50);
        for line in out.lines() {
            let first = line.chars().next().unwrap();
            assert_eq!(line.len(), 64);
            assert!(line.chars().all(|c| c == first), "torn line: {line}");
        }
    }
}
