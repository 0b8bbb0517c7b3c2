//! Engine process transport.
//!
//! The engine runs as a child process. Messages are JSON text in frames of a
//! 4-byte big-endian length followed by the UTF-8 payload, written to the
//! child's stdin and read from its stdout.

use std::ffi::OsStr;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use ime_session::EngineChannel;

/// Largest frame accepted in either direction.
pub const MAX_FRAME: usize = 4 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("frame too large: {len} > {max}")]
    FrameTooLarge { len: usize, max: usize },
    #[error("frame is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("engine process has no {0} pipe")]
    MissingPipe(&'static str),
}

impl From<TransportError> for io::Error {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

pub fn read_frame(reader: &mut impl Read, max: usize) -> Result<Vec<u8>, TransportError> {
    let mut len_buf = [0_u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max {
        return Err(TransportError::FrameTooLarge { len, max });
    }
    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

pub fn write_frame(writer: &mut impl Write, payload: &[u8], max: usize) -> Result<(), TransportError> {
    if payload.len() > max {
        return Err(TransportError::FrameTooLarge {
            len: payload.len(),
            max,
        });
    }
    let len = u32::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read messages until the stream ends. A clean EOF between frames is
/// `Ok(())`; anything else is an error.
pub fn reader_loop<R, F>(mut reader: R, mut on_message: F) -> Result<(), TransportError>
where
    R: Read,
    F: FnMut(String),
{
    loop {
        match read_frame(&mut reader, MAX_FRAME) {
            Ok(payload) => on_message(String::from_utf8(payload)?),
            Err(TransportError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(())
            }
            Err(e) => return Err(e),
        }
    }
}

/// Outgoing half of the engine channel: frames each message onto a writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EngineChannel for FrameWriter<W> {
    fn post(&mut self, message: String) -> io::Result<()> {
        write_frame(&mut self.writer, message.as_bytes(), MAX_FRAME)?;
        self.writer.flush()
    }
}

/// A running engine process.
pub struct EngineProcess {
    child: Child,
}

impl EngineProcess {
    /// Start the engine; returns the process, its framed stdin and its raw
    /// stdout for [`reader_loop`].
    pub fn spawn<I, S>(
        program: impl AsRef<OsStr>,
        args: I,
    ) -> Result<(Self, FrameWriter<ChildStdin>, ChildStdout), TransportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(program.as_ref())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or(TransportError::MissingPipe("stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::MissingPipe("stdout"))?;
        debug!(pid = child.id(), "engine process started");
        Ok((Self { child }, FrameWriter::new(stdin), stdout))
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn shutdown(mut self) -> Result<(), TransportError> {
        if self.child.try_wait()?.is_none() {
            if let Err(e) = self.child.kill() {
                warn!("failed to kill engine process: {e}");
            }
        }
        let status = self.child.wait()?;
        debug!(%status, "engine process exited");
        Ok(())
    }
}
