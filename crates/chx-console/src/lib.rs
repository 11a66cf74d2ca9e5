//! Incremental log console for the chx administration UI.
//!
//! Long-running background commands (hotspot setup, NAT forwarding, backups)
//! produce log lines at unpredictable, sometimes very high rates. This crate
//! renders them onto a bounded display surface without janking the host UI,
//! without losing the user's manual scroll position, and with best-effort
//! durability across reattachment:
//!
//! - appends are buffered and drained in bounded batches on a short timer
//! - the surface retains at most a configured number of regular lines;
//!   the oldest are evicted first, progress-indicator lines are exempt
//! - the viewport follows new output only while pinned to the bottom
//! - rendered content is saved (debounced) to a durable key-value slot and
//!   restored the next time a surface is attached
//! - rendered text can be copied out with a primary and a fallback
//!   clipboard mechanism
//!
//! The display surface, the durable store, and the clipboard are injected
//! capabilities, so the whole pipeline runs headlessly under test.

pub mod clipboard;
pub mod config;
pub mod console;
pub mod line;
pub mod runtime;
pub mod scroll;
pub mod store;
pub mod surface;

pub use clipboard::{ClipboardError, ClipboardService, SystemClipboard};
pub use config::ConsoleConfig;
pub use console::Console;
pub use line::{Entrance, LogLine, PROGRESS_STYLE_CLASS, RenderedNode};
pub use runtime::{LogConsole, ScrollOptions};
pub use scroll::ScrollState;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use surface::{DisplaySurface, ScrollBehavior, ScrollMetrics, TextSurface};
