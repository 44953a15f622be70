//! The job's run script: a bash file assembled by the workflow tasks and
//! executed by the launcher.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

type ScriptWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open (or closed) run script.
///
/// Lines are buffered until [`close`](Self::close), which flushes and shuts
/// the writer down. A closed script rejects further writes.
pub struct RunScript {
    path: PathBuf,
    writer: Option<ScriptWriter>,
}

impl RunScript {
    /// Create (or truncate) the script file at `path`.
    pub async fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = tokio::fs::File::create(&path).await?;
        Ok(Self::with_writer(path, BufWriter::new(file)))
    }

    /// Script backed by an arbitrary writer. `path` is still the file the
    /// launcher will execute.
    pub fn with_writer<W>(path: impl Into<PathBuf>, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            path: path.into(),
            writer: Some(Box::new(writer)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Append `line` followed by a newline.
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "run script is already closed")
        })?;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await
    }

    /// `export NAME=<quoted value>`
    pub async fn export(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.write_line(&format!("export {name}={}", shell_quote(value)))
            .await
    }

    /// Flush buffered content and close the script. Closing twice is a no-op.
    ///
    /// The writer is released only once flush and shutdown both succeed. A
    /// failed close leaves the script open with its buffer intact, so the
    /// next `close` retries and fails again until the data is on disk.
    pub async fn close(&mut self) -> io::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        writer.flush().await?;
        writer.shutdown().await?;
        self.writer = None;
        Ok(())
    }
}

impl fmt::Debug for RunScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunScript")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Quote `value` for safe inclusion in a POSIX shell command line.
pub fn shell_quote(value: &str) -> String {
    shell_escape::unix::escape(Cow::Borrowed(value)).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
