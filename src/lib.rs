//! Windowed rendering and reading-position restoration for long texts.
//!
//! Text is split into paragraph segments, only a bounded window of them is
//! mounted on the [`surface::ReaderSurface`] at a time, and each reading slot
//! remembers the segment and pixel offset the reader was at. The
//! [`session::ReaderSession`] ties the pieces together.

pub mod anchor;
pub mod cancellation;
pub mod config;
pub mod height;
pub mod progress;
pub mod scheduler;
pub mod segment;
pub mod session;
pub mod storage;
pub mod surface;
pub mod window;

pub use anchor::Anchor;
pub use config::{ReaderConfig, load_config};
pub use progress::{ProgressSource, ProgressUpdate};
pub use session::{ReaderSession, RestorePhase};
pub use storage::{FileStore, KeyValueStore, MemoryStore, SlotId};
pub use surface::{HeadlessSurface, LayoutMetrics, ReaderSurface};
