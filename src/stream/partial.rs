use std::cmp::min;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::{Result, StreamError};
use crate::lock::StreamGuard;
use crate::stream::{begin_offset, resolve_seek, SeekOrigin, Stream, Transfer};

/// A fixed window `[offset, offset + size)` over another stream.
///
/// The window keeps its own cursor in `[0, size]`. Every read or write
/// moves the base cursor to the translated position, performs the
/// transfer and puts the base cursor back where it was. The window has
/// no advisory lock of its own: locking it locks the base, and with it
/// every other window over the same base.
pub struct PartialStream<S: Stream + ?Sized> {
    base: Arc<S>,
    offset: u64,
    size: u64,
    position: Mutex<u64>,
}

impl<S: Stream + ?Sized> PartialStream<S> {
    /// Fails when the window does not fit inside the current length of
    /// `base`.
    pub fn new(base: Arc<S>, offset: u64, size: u64) -> Result<Self> {
        let length = base.length();
        let fits = offset
            .checked_add(size)
            .map_or(false, |end| end <= length);
        if !fits {
            return Err(StreamError::WindowOutOfBounds {
                offset,
                size,
                length,
            });
        }

        log::debug!(
            "Partial stream over [{}, {}) of a {} byte stream",
            offset,
            offset + size,
            length
        );
        Ok(Self {
            base,
            offset,
            size,
            position: Mutex::new(0),
        })
    }

    pub fn base(&self) -> &Arc<S> {
        &self.base
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn cursor(&self) -> MutexGuard<'_, u64> {
        self.position
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Bytes reachable from local position `position`, bounded by both
    /// the window and the current length of the base.
    fn available(&self, position: u64) -> u64 {
        let window = self.size - position;
        let base_length = self.base.length();
        let start = self.offset + position;
        if start > base_length {
            log::warn!(
                "Window position {} lies beyond the end of its base ({} bytes)",
                start,
                base_length
            );
            return 0;
        }
        min(window, base_length - start)
    }

    /// Run `transfer` with the base cursor at local position `position`,
    /// then restore the base cursor.
    fn at_base(
        &self,
        position: u64,
        transfer: impl FnOnce(&S) -> Transfer,
    ) -> Transfer {
        let saved = self.base.position();
        let target = begin_offset(self.offset + position);
        let result = if self.base.set_position(SeekOrigin::Begin, target) {
            transfer(&*self.base)
        } else {
            Transfer::failed()
        };
        if !self.base.set_position(SeekOrigin::Begin, begin_offset(saved)) {
            log::warn!(
                "Failed to restore base position {}, left at {}",
                saved,
                self.base.position()
            );
        }
        result
    }
}

impl<S: Stream + ?Sized> Stream for PartialStream<S> {
    fn can_write(&self) -> bool {
        self.base.can_write()
    }

    fn can_resize(&self) -> bool {
        false
    }

    fn length(&self) -> u64 {
        self.size
    }

    fn position(&self) -> u64 {
        *self.cursor()
    }

    fn set_length(&self, _length: u64) -> bool {
        false
    }

    fn set_position(&self, origin: SeekOrigin, offset: i64) -> bool {
        let mut position = self.cursor();
        let (target, in_range) =
            resolve_seek(origin, offset, *position, self.size);
        *position = target;
        in_range
    }

    fn read_bytes(&self, dst: &mut [u8]) -> Transfer {
        let requested = dst.len() as u64;
        if requested == 0 {
            return Transfer::new(0, 0);
        }

        let mut position = self.cursor();
        let count = min(requested, self.available(*position)) as usize;
        if count == 0 {
            return Transfer::new(0, requested);
        }

        let read =
            self.at_base(*position, |base| base.read_bytes(&mut dst[..count]));
        *position += read.len;

        Transfer::new(read.len, requested)
    }

    fn write_bytes(&self, src: &[u8]) -> Transfer {
        if !self.can_write() {
            return Transfer::failed();
        }
        let requested = src.len() as u64;
        if requested == 0 {
            return Transfer::new(0, 0);
        }

        let mut position = self.cursor();
        let count = min(requested, self.available(*position)) as usize;
        if count == 0 {
            return Transfer::new(0, requested);
        }

        let written =
            self.at_base(*position, |base| base.write_bytes(&src[..count]));
        *position += written.len;

        Transfer::new(written.len, requested)
    }

    fn lock(&self) -> StreamGuard<'_> {
        self.base.lock()
    }

    fn try_lock(&self) -> Option<StreamGuard<'_>> {
        self.base.try_lock()
    }
}
