//! Core systems for Horizon Earcon.
//!
//! This crate provides the building blocks the playback coordinator is made
//! of:
//!
//! - **Signal/Slot System**: Type-safe notifications for completion and errors
//! - **Completion Latches**: Turning many asynchronous completions into one
//! - **Logging**: Tracing targets, span names and a performance span guard
//!
//! # Signal/Slot Example
//!
//! ```
//! use earcon_core::Signal;
//!
//! let voice_finished = Signal::<u64>::new();
//!
//! let conn_id = voice_finished.connect(|voice| {
//!     println!("Voice {} finished", voice);
//! });
//!
//! voice_finished.emit(7);
//! voice_finished.disconnect(conn_id);
//! ```
//!
//! # Latch Example
//!
//! ```
//! use earcon_core::CountdownLatch;
//!
//! let latch = CountdownLatch::new(2);
//! assert!(!latch.count_down());
//! assert!(latch.count_down());
//! ```

pub mod latch;
pub mod logging;
pub mod signal;

pub use latch::{CountdownLatch, OnceFlag};
pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal};
