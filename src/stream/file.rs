use std::cmp::min;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::{Result, StreamError};
use crate::lock::{AdvisoryLock, StreamGuard};
use crate::stream::{resolve_seek, SeekOrigin, Stream, Transfer};

struct State {
    file: File,
    position: u64,
    length: u64,
}

impl State {
    /// Re-read cursor and length from the handle after it was written to.
    fn refresh(&mut self, path: &Path) {
        match self.file.stream_position() {
            Ok(position) => self.position = position,
            Err(err) => log::warn!(
                "Failed to query position of {}: {}",
                path.display(),
                err
            ),
        }
        self.sync_length(path);
    }

    /// Pick up the current length of the file, which may have been
    /// changed through another handle, and pull the cursor back if the
    /// file shrank below it.
    fn sync_length(&mut self, path: &Path) {
        match self.file.metadata() {
            Ok(metadata) => self.length = metadata.len(),
            Err(err) => {
                log::warn!(
                    "Failed to query length of {}: {}",
                    path.display(),
                    err
                );
                self.length = self.length.max(self.position);
                return;
            }
        }
        if self.position <= self.length {
            return;
        }

        log::debug!(
            "{} shrank to {} bytes under the cursor at {}",
            path.display(),
            self.length,
            self.position
        );
        match self.file.seek(SeekFrom::Start(self.length)) {
            Ok(position) => self.position = position,
            Err(err) => {
                log::warn!("Failed to seek in {}: {}", path.display(), err);
                self.length = self.position;
            }
        }
    }
}

/// Stream over an OS file handle.
///
/// The length follows the file on disk: it is read back from the handle
/// before every operation, so changes made through other handles are
/// seen, and writes at the end extend it. The stream is
/// never resizable, so `set_length` always fails and seeks stop at the
/// current end of file.
pub struct FileStream {
    path: PathBuf,
    writable: bool,
    state: Mutex<State>,
    lock: AdvisoryLock,
}

impl FileStream {
    /// Open an existing file, for reading and also for writing when
    /// `writable` is set.
    pub fn open(path: impl AsRef<Path>, writable: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&path)
            .map_err(|source| StreamError::Open {
                path: path.clone(),
                source,
            })?;
        Self::from_file(path, file, writable)
    }

    /// Create `path`, truncating any previous content, and open it
    /// writable.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| StreamError::Open {
                path: path.clone(),
                source,
            })?;
        Self::from_file(path, file, true)
    }

    fn from_file(path: PathBuf, file: File, writable: bool) -> Result<Self> {
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(StreamError::Open {
                path,
                source: std::io::Error::new(
                    ErrorKind::InvalidInput,
                    "not a regular file",
                ),
            });
        }

        log::debug!(
            "Opened {} ({} bytes, writable: {})",
            path.display(),
            metadata.len(),
            writable
        );
        Ok(Self {
            path,
            writable,
            state: Mutex::new(State {
                file,
                position: 0,
                length: metadata.len(),
            }),
            lock: AdvisoryLock::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Stream for FileStream {
    fn can_write(&self) -> bool {
        self.writable
    }

    fn can_resize(&self) -> bool {
        false
    }

    fn length(&self) -> u64 {
        let mut state = self.state();
        state.sync_length(&self.path);
        state.length
    }

    fn position(&self) -> u64 {
        let mut state = self.state();
        state.sync_length(&self.path);
        state.position
    }

    fn set_length(&self, _length: u64) -> bool {
        false
    }

    fn set_position(&self, origin: SeekOrigin, offset: i64) -> bool {
        let mut state = self.state();
        state.sync_length(&self.path);
        let (target, in_range) =
            resolve_seek(origin, offset, state.position, state.length);
        match state.file.seek(SeekFrom::Start(target)) {
            Ok(position) => {
                state.position = position;
                in_range
            }
            Err(err) => {
                log::warn!(
                    "Failed to seek in {}: {}",
                    self.path.display(),
                    err
                );
                false
            }
        }
    }

    fn read_bytes(&self, dst: &mut [u8]) -> Transfer {
        let requested = dst.len() as u64;
        if requested == 0 {
            return Transfer::new(0, 0);
        }

        let mut state = self.state();
        state.sync_length(&self.path);
        let count = min(requested, state.length - state.position) as usize;
        let dst = &mut dst[..count];

        let mut filled = 0;
        while filled < dst.len() {
            match state.file.read(&mut dst[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::warn!(
                        "Failed to read from {}: {}",
                        self.path.display(),
                        err
                    );
                    break;
                }
            }
        }
        state.position += filled as u64;

        Transfer::new(filled as u64, requested)
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
        state.sync_length(&self.path);
        let mut written = 0;
        while written < src.len() {
            match state.file.write(&src[written..]) {
                Ok(0) => break,
                Ok(count) => written += count,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::warn!(
                        "Failed to write to {}: {}",
                        self.path.display(),
                        err
                    );
                    break;
                }
            }
        }
        state.refresh(&self.path);

        Transfer::new(written as u64, requested)
    }

    fn lock(&self) -> StreamGuard<'_> {
        self.lock.lock()
    }

    fn try_lock(&self) -> Option<StreamGuard<'_>> {
        self.lock.try_lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialize;
    use crate::stream::operations::{apply, Operation};
    use quickcheck_macros::quickcheck;
    use tempdir::TempDir;

    #[test]
    fn set_length_is_rejected() {
        initialize();

        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("fixed.bin");
        let stream = FileStream::create(&path).unwrap();

        let written = stream.write_bytes(&[7u8; 100]);
        assert!(written.is_complete());
        assert_eq!(stream.length(), 100);

        assert!(!stream.can_resize());
        assert!(!stream.set_length(200));
        assert!(!stream.set_length(10));
        assert_eq!(stream.length(), 100);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 100);
    }

    #[test]
    fn reads_existing_content() {
        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("content.bin");
        std::fs::write(&path, b"hello file stream").unwrap();

        let stream = FileStream::open(&path, false).unwrap();
        assert_eq!(stream.length(), 17);
        assert!(!stream.can_write());
        assert_eq!(stream.path(), path.as_path());

        let mut out = [0u8; 5];
        assert!(stream.read_bytes(&mut out).is_complete());
        assert_eq!(&out, b"hello");
        assert_eq!(stream.position(), 5);

        assert!(stream.set_position(SeekOrigin::End, -6));
        let mut tail = [0u8; 10];
        assert_eq!(stream.read_bytes(&mut tail), Transfer::new(6, 10));
        assert_eq!(&tail[..6], b"stream");
        assert_eq!(stream.position(), stream.length());
    }

    #[test]
    fn read_only_file_rejects_writes() {
        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("ro.bin");
        std::fs::write(&path, b"abc").unwrap();

        let stream = FileStream::open(&path, false).unwrap();
        assert_eq!(stream.write_bytes(b"xyz"), Transfer::failed());
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn overwrite_in_place_and_extend() {
        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("rw.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let stream = FileStream::open(&path, true).unwrap();
        assert!(stream.set_position(SeekOrigin::Begin, 8));
        assert!(stream.write_bytes(b"abcd").is_complete());
        assert_eq!(stream.position(), 12);
        assert_eq!(stream.length(), 12);
        assert_eq!(std::fs::read(&path).unwrap(), b"01234567abcd");
    }

    #[test]
    fn seeks_are_clamped() {
        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("seek.bin");
        std::fs::write(&path, [0u8; 32]).unwrap();

        let stream = FileStream::open(&path, true).unwrap();
        assert!(!stream.set_position(SeekOrigin::Begin, 40));
        assert_eq!(stream.position(), 32);
        assert!(!stream.set_position(SeekOrigin::Current, -33));
        assert_eq!(stream.position(), 0);
        assert!(stream.set_position(SeekOrigin::End, 0));
        assert_eq!(stream.position(), stream.length());
    }

    #[test]
    fn growth_through_another_handle_is_seen() {
        initialize();

        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("grows.bin");
        std::fs::write(&path, [1u8; 10]).unwrap();

        let stream = FileStream::open(&path, false).unwrap();
        let mut out = [0u8; 8];
        assert!(stream.read_bytes(&mut out).is_complete());

        std::fs::write(&path, [2u8; 30]).unwrap();
        assert_eq!(stream.length(), 30);

        let mut out = [0u8; 40];
        assert_eq!(stream.read_bytes(&mut out), Transfer::new(22, 40));
        assert_eq!(stream.position(), 30);
        assert!(stream.position() <= stream.length());
        assert!(stream.set_position(SeekOrigin::End, -5));
        assert_eq!(stream.position(), 25);
    }

    #[test]
    fn truncation_through_another_handle_pulls_cursor_back() {
        initialize();

        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("shrinks.bin");
        std::fs::write(&path, [3u8; 30]).unwrap();

        let stream = FileStream::open(&path, true).unwrap();
        assert!(stream.set_position(SeekOrigin::End, 0));
        assert_eq!(stream.position(), 30);

        std::fs::write(&path, [4u8; 10]).unwrap();
        assert_eq!(stream.position(), 10);
        assert_eq!(stream.length(), 10);

        let mut out = [0u8; 4];
        assert_eq!(stream.read_bytes(&mut out), Transfer::new(0, 4));
        assert!(stream.write_bytes(b"tail").is_complete());
        assert_eq!(std::fs::read(&path).unwrap()[10..], *b"tail");
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("missing.bin");

        match FileStream::open(&path, false) {
            Err(StreamError::Open { path: failed, .. }) => {
                assert_eq!(failed, path)
            }
            _ => panic!("opening a missing file must fail"),
        }
    }

    #[test]
    fn directory_fails_to_open() {
        let dir = TempDir::new("file_stream").unwrap();
        assert!(matches!(
            FileStream::open(dir.path(), false),
            Err(StreamError::Open { .. })
        ));
    }

    #[quickcheck]
    fn prop_position_within_length(operations: Vec<Operation>, writable: bool) {
        let dir = TempDir::new("file_stream").unwrap();
        let path = dir.path().join("prop.bin");
        std::fs::write(&path, [5u8; 200]).unwrap();

        let stream = FileStream::open(&path, writable).unwrap();
        apply(&stream, operations);
        assert_eq!(
            stream.length(),
            std::fs::metadata(&path).unwrap().len()
        );
    }
}
