use std::cmp::{max, min};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::{Result, StreamError};
use crate::lock::{AdvisoryLock, StreamGuard};
use crate::stream::{resolve_seek, SeekOrigin, Stream, Transfer};
use crate::{GROWTH_DENOMINATOR, GROWTH_NUMERATOR};

enum Buffer<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
    ReadOnly(&'a [u8]),
}

impl Buffer<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Owned(data) => data,
            Buffer::Borrowed(data) => data,
            Buffer::ReadOnly(data) => data,
        }
    }

    fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Buffer::Owned(data) => Some(data),
            Buffer::Borrowed(data) => Some(data),
            Buffer::ReadOnly(_) => None,
        }
    }

    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }
}

struct State<'a> {
    buffer: Buffer<'a>,
    position: u64,
}

impl State<'_> {
    /// Reallocate an owned buffer to `length` bytes, keeping the common
    /// prefix. New bytes are zeroed.
    fn resize(&mut self, length: u64) -> bool {
        let Buffer::Owned(data) = &mut self.buffer else {
            return false;
        };
        let Ok(length) = usize::try_from(length) else {
            return false;
        };
        if length > data.len() && data.try_reserve(length - data.len()).is_err()
        {
            log::warn!("Failed to allocate {} bytes for memory stream", length);
            return false;
        }

        data.resize(length, 0);
        self.position = min(self.position, length as u64);
        true
    }

    fn remaining(&self) -> u64 {
        self.buffer.len() - self.position
    }
}

/// Stream over a single contiguous byte buffer.
///
/// The buffer is either owned by the stream (copied from or handed over
/// by the caller, or freshly allocated) or borrowed from the caller for
/// `'a`. Only owned buffers may be resizable.
pub struct MemoryStream<'a> {
    state: Mutex<State<'a>>,
    writable: bool,
    resizable: bool,
    lock: AdvisoryLock,
}

impl MemoryStream<'static> {
    /// Copy `src` into a buffer owned by the stream.
    pub fn copy_from(
        src: &[u8],
        writable: bool,
        resizable: bool,
    ) -> Result<Self> {
        if src.is_empty() {
            return Err(StreamError::EmptySource);
        }
        Ok(Self::owned(src.to_vec(), writable, resizable))
    }

    /// Take ownership of `data` without copying it.
    pub fn from_vec(
        data: Vec<u8>,
        writable: bool,
        resizable: bool,
    ) -> Result<Self> {
        if data.is_empty() {
            return Err(StreamError::EmptySource);
        }
        Ok(Self::owned(data, writable, resizable))
    }

    /// Allocate a zeroed buffer of `length` bytes.
    pub fn with_length(length: usize, writable: bool, resizable: bool) -> Self {
        Self::owned(vec![0; length], writable, resizable)
    }

    fn owned(data: Vec<u8>, writable: bool, resizable: bool) -> Self {
        log::debug!(
            "Memory stream over {} owned bytes (writable: {}, resizable: {})",
            data.len(),
            writable,
            resizable
        );
        Self::new(Buffer::Owned(data), writable, resizable)
    }
}

impl<'a> MemoryStream<'a> {
    /// Wrap caller memory. The stream never resizes it.
    pub fn borrowed(data: &'a mut [u8], writable: bool) -> Result<Self> {
        if data.is_empty() {
            return Err(StreamError::EmptySource);
        }
        log::debug!("Memory stream over {} borrowed bytes", data.len());
        Ok(Self::new(Buffer::Borrowed(data), writable, false))
    }

    /// Wrap caller memory that can only be read.
    pub fn read_only(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(StreamError::EmptySource);
        }
        log::debug!("Memory stream over {} read-only bytes", data.len());
        Ok(Self::new(Buffer::ReadOnly(data), false, false))
    }

    fn new(buffer: Buffer<'a>, writable: bool, resizable: bool) -> Self {
        Self {
            state: Mutex::new(State {
                buffer,
                position: 0,
            }),
            writable,
            resizable,
            lock: AdvisoryLock::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State<'a>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the whole buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.state().buffer.as_slice().to_vec()
    }

    /// Run `f` against the buffer without copying it.
    ///
    /// The stream stays locked while `f` runs, so `f` must not call back
    /// into this stream: any [`Stream`] method on it would deadlock. Take
    /// a [`to_vec`](Self::to_vec) snapshot when that is needed.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.state().buffer.as_slice())
    }

    /// Consume the stream and return its bytes. Borrowed buffers are copied.
    pub fn into_vec(self) -> Vec<u8> {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        match state.buffer {
            Buffer::Owned(data) => data,
            Buffer::Borrowed(data) => data.to_vec(),
            Buffer::ReadOnly(data) => data.to_vec(),
        }
    }
}

impl Stream for MemoryStream<'_> {
    fn can_write(&self) -> bool {
        self.writable
    }

    fn can_resize(&self) -> bool {
        self.resizable
    }

    fn length(&self) -> u64 {
        self.state().buffer.len()
    }

    fn position(&self) -> u64 {
        self.state().position
    }

    fn set_length(&self, length: u64) -> bool {
        if !self.resizable {
            return false;
        }
        self.state().resize(length)
    }

    fn set_position(&self, origin: SeekOrigin, offset: i64) -> bool {
        let mut state = self.state();
        let (position, in_range) =
            resolve_seek(origin, offset, state.position, state.buffer.len());
        state.position = position;
        in_range
    }

    fn read_bytes(&self, dst: &mut [u8]) -> Transfer {
        let requested = dst.len() as u64;
        if requested == 0 {
            return Transfer::new(0, 0);
        }

        let mut state = self.state();
        let count = min(requested, state.remaining()) as usize;
        let start = state.position as usize;
        dst[..count]
            .copy_from_slice(&state.buffer.as_slice()[start..start + count]);
        state.position += count as u64;

        Transfer::new(count as u64, requested)
    }

    fn write_bytes(&self, src: &[u8]) -> Transfer {
        if !self.writable {
            return Transfer::failed();
        }
        let requested = src.len() as u64;
        if requested == 0 {
            return Transfer::new(0, 0);
        }

        let mut state = self.state();
        let remaining = state.remaining();
        if remaining < requested && self.resizable {
            let length = state.buffer.len();
            let grown = max(
                length * GROWTH_NUMERATOR / GROWTH_DENOMINATOR,
                length + (requested - remaining),
            );
            log::debug!(
                "Growing memory stream from {} to {} bytes",
                length,
                grown
            );
            if !state.resize(grown) {
                return Transfer::failed();
            }
        }

        let count = min(requested, state.remaining()) as usize;
        let start = state.position as usize;
        let Some(buffer) = state.buffer.as_mut_slice() else {
            return Transfer::failed();
        };
        buffer[start..start + count].copy_from_slice(&src[..count]);
        state.position += count as u64;

        Transfer::new(count as u64, requested)
    }

    fn lock(&self) -> StreamGuard<'_> {
        self.lock.lock()
    }

    fn try_lock(&self) -> Option<StreamGuard<'_>> {
        self.lock.try_lock()
    }
}
