//! Buffered copy with a reusable buffer and an optional byte ceiling.
//!
//! Staging an upload, extracting archive entries and hashing files all move
//! bytes through the same loop; a single [`CopyBuffer`] is kept for the whole
//! session so no buffer is allocated per file.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::IngestError;

/// Buffer size for I/O operations (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable heap buffer for file copying.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Creates a new zeroed copy buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.buf.len()
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a bounded copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The source was exhausted; holds the number of bytes copied.
    Complete(u64),
    /// The source produced more than the ceiling. Holds the number of bytes
    /// read so far, which is greater than the ceiling.
    Exceeded(u64),
}

/// Copies everything from `reader` to `writer`.
///
/// # Errors
///
/// Returns an error if reading or writing fails. Interrupted reads are
/// retried.
///
/// # Examples
///
/// ```
/// use sluice_core::copy::{CopyBuffer, copy_with_buffer};
/// use std::io::Cursor;
///
/// let mut buffer = CopyBuffer::new();
/// let mut output = Vec::new();
/// let copied = copy_with_buffer(&mut Cursor::new(b"hello"), &mut output, &mut buffer)?;
/// assert_eq!(copied, 5);
/// # Ok::<(), sluice_core::IngestError>(())
/// ```
#[inline]
pub fn copy_with_buffer<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
) -> Result<u64, IngestError> {
    match copy_bounded(reader, writer, buffer, None)? {
        CopyOutcome::Complete(n) | CopyOutcome::Exceeded(n) => Ok(n),
    }
}

/// Copies from `reader` to `writer`, stopping as soon as more than `limit`
/// bytes have been read.
///
/// With `limit == None` this behaves like [`copy_with_buffer`]. The sizes
/// reported are measured from the stream, never taken from metadata.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub fn copy_bounded<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    limit: Option<u64>,
) -> Result<CopyOutcome, IngestError> {
    let mut total: u64 = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer.buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(IngestError::Io(e)),
        };

        total = total.saturating_add(bytes_read as u64);
        if let Some(max) = limit
            && total > max
        {
            return Ok(CopyOutcome::Exceeded(total));
        }

        writer
            .write_all(&buffer.buf[..bytes_read])
            .map_err(IngestError::Io)?;
    }

    Ok(CopyOutcome::Complete(total))
}
