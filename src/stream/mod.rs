pub mod file;
pub mod memory;
pub mod partial;

use std::cmp::min;
use std::sync::Arc;

use crate::lock::StreamGuard;
use crate::FILL_CHUNK_SIZE;

/// Reference point for [`Stream::set_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// Outcome of a single read or write.
///
/// `len` is the number of bytes actually moved and `complete` tells
/// whether that was everything the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub len: u64,
    pub complete: bool,
}

impl Transfer {
    pub fn new(len: u64, requested: u64) -> Self {
        Self {
            len,
            complete: len == requested,
        }
    }

    /// Nothing was moved and the request is reported as failed,
    /// even when it was empty.
    pub fn failed() -> Self {
        Self {
            len: 0,
            complete: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// A stream shared between owners, e.g. a base stream and the
/// [`partial::PartialStream`] windows created over it.
pub type SharedStream<'a> = Arc<dyn Stream + 'a>;

/// Position-addressed access to a bounded range of bytes.
///
/// Every backend keeps `0 <= position() <= length()` after each call.
/// Failures never surface as errors here: reads and writes report the
/// bytes they moved through [`Transfer`], while seeks and resizes
/// return `false` and leave the stream in a well-defined state.
///
/// All methods take `&self` so a stream can be shared across threads.
/// Individual calls are safe on their own, but a seek followed by a
/// read is two calls; accessors that need such a sequence to be
/// uninterrupted must hold [`Stream::lock`] around it.
pub trait Stream: Send + Sync {
    fn can_write(&self) -> bool;

    fn can_resize(&self) -> bool;

    fn length(&self) -> u64;

    fn position(&self) -> u64;

    /// Change the total length. Only resizable streams accept this,
    /// everyone else returns `false` and keeps the current length.
    fn set_length(&self, length: u64) -> bool;

    /// Move the cursor relative to `origin`.
    ///
    /// A target before the start clamps to 0 and a target past the end
    /// clamps to `length()`; both report `false`.
    fn set_position(&self, origin: SeekOrigin, offset: i64) -> bool;

    /// Read up to `dst.len()` bytes from the current position.
    fn read_bytes(&self, dst: &mut [u8]) -> Transfer;

    /// Write `src` at the current position, growing the stream first
    /// if it is resizable and too short.
    fn write_bytes(&self, src: &[u8]) -> Transfer;

    /// Block until the advisory lock of this stream is held.
    fn lock(&self) -> StreamGuard<'_>;

    fn try_lock(&self) -> Option<StreamGuard<'_>>;
}

/// Resolve a seek request against the current cursor and length.
///
/// Returns the position to commit and whether the request was inside
/// `[0, length]`.
pub(crate) fn resolve_seek(
    origin: SeekOrigin,
    offset: i64,
    position: u64,
    length: u64,
) -> (u64, bool) {
    let anchor = match origin {
        SeekOrigin::Begin => 0,
        SeekOrigin::Current => position,
        SeekOrigin::End => length,
    };
    let candidate = i128::from(anchor) + i128::from(offset);
    if candidate < 0 {
        (0, false)
    } else if candidate > i128::from(length) {
        (length, false)
    } else {
        (candidate as u64, true)
    }
}

/// Absolute position as an offset from [`SeekOrigin::Begin`].
pub(crate) fn begin_offset(position: u64) -> i64 {
    i64::try_from(position).unwrap_or(i64::MAX)
}

/// Copy `total_len` bytes from the current position of `src` to the
/// current position of `dst`, one chunk of [`FILL_CHUNK_SIZE`] at a time.
///
/// Neither cursor is rewound. Copying stops early when `src` runs dry
/// or `dst` refuses part of a chunk. Returns whether all `total_len`
/// bytes were moved.
pub fn fill_stream<S, D>(src: &S, dst: &D, total_len: u64) -> bool
where
    S: Stream + ?Sized,
    D: Stream + ?Sized,
{
    let mut chunk = [0u8; FILL_CHUNK_SIZE];
    let mut moved: u64 = 0;

    while moved < total_len {
        let wanted = min(total_len - moved, FILL_CHUNK_SIZE as u64) as usize;
        let read = src.read_bytes(&mut chunk[..wanted]);
        if read.len == 0 {
            break;
        }

        let written = dst.write_bytes(&chunk[..read.len as usize]);
        moved += written.len;
        log::trace!("fill_stream moved {} of {} bytes", moved, total_len);

        if written.len < read.len {
            log::warn!(
                "Destination accepted {} of {} bytes, stopping copy",
                written.len,
                read.len
            );
            break;
        }
    }

    moved == total_len
}

/// Random operation sequences for property tests of any backend.
#[cfg(test)]
pub(crate) mod operations {
    use quickcheck::{Arbitrary, Gen};

    use super::{SeekOrigin, Stream};

    pub(crate) const MAX_LEN: usize = 4096;

    #[derive(Clone, Debug)]
    pub(crate) enum Operation {
        Seek(u8, i16),
        Read(u16),
        Write(u16),
        Resize(u16),
    }

    impl Arbitrary for Operation {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = u16::arbitrary(g) % MAX_LEN as u16;
            match u8::arbitrary(g) % 4 {
                0 => Operation::Seek(u8::arbitrary(g) % 3, i16::arbitrary(g)),
                1 => Operation::Read(len),
                2 => Operation::Write(len),
                _ => Operation::Resize(len),
            }
        }
    }

    /// Apply `operations` to `stream`, checking after each one that the
    /// cursor moved by exactly the bytes transferred and stayed within
    /// `[0, length]`.
    pub(crate) fn apply(stream: &dyn Stream, operations: Vec<Operation>) {
        let mut scratch = vec![0u8; MAX_LEN];
        assert!(stream.position() <= stream.length());

        for operation in operations {
            match operation {
                Operation::Seek(origin, offset) => {
                    let origin = match origin {
                        0 => SeekOrigin::Begin,
                        1 => SeekOrigin::Current,
                        _ => SeekOrigin::End,
                    };
                    stream.set_position(origin, i64::from(offset));
                }
                Operation::Read(len) => {
                    let before = stream.position();
                    let read = stream.read_bytes(&mut scratch[..len as usize]);
                    assert!(read.len <= u64::from(len));
                    assert_eq!(stream.position(), before + read.len);
                }
                Operation::Write(len) => {
                    let before = stream.position();
                    let written = stream.write_bytes(&scratch[..len as usize]);
                    assert!(written.len <= u64::from(len));
                    assert_eq!(stream.position(), before + written.len);
                    if stream.can_resize() {
                        assert!(written.is_complete());
                    }
                }
                Operation::Resize(len) => {
                    let resized = stream.set_length(u64::from(len));
                    assert_eq!(resized, stream.can_resize());
                }
            }
            assert!(stream.position() <= stream.length());
        }
    }
}
