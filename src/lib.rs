pub mod binary;
mod errors;
pub mod hash;
pub mod lock;
pub mod stopwatch;
pub mod stream;

pub use binary::{BinaryReader, BinaryWriter};
pub use errors::{Result, StreamError};
pub use hash::{hash_combine, super_fast_hash};
pub use lock::{AdvisoryLock, StreamGuard};
pub use stopwatch::{Clock, MonotonicClock, StopWatch};
pub use stream::file::FileStream;
pub use stream::memory::MemoryStream;
pub use stream::partial::PartialStream;
pub use stream::{fill_stream, SeekOrigin, SharedStream, Stream, Transfer};

/// Size of the scratch buffer used by [`fill_stream`].
pub const FILL_CHUNK_SIZE: usize = 8192;

// A resizable memory stream that runs out of room grows to at least
// GROWTH_NUMERATOR / GROWTH_DENOMINATOR of its current length.
pub const GROWTH_NUMERATOR: u64 = 3;
pub const GROWTH_DENOMINATOR: u64 = 2;

#[cfg(test)]
static INIT: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
pub(crate) fn initialize() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        log::info!("Initializing bytestream tests");
    });
}
