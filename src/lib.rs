//! # websocket-stat
//!
//! Observes websocket traffic passing through a proxy: frames are recognised
//! incrementally from arbitrarily chunked byte streams, counted per direction
//! and logged through compiled line templates.
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Instant;
//! use websocket_stat::{Direction, Limits, LogTemplates, Monitor, RequestInfo, TracingSink};
//!
//! let monitor = Arc::new(Monitor::new(LogTemplates::default(), Arc::new(TracingSink), Limits::default()));
//! if let Some(connection) = monitor.open(RequestInfo::default(), Instant::now()) {
//!     connection.activate(Instant::now());
//!     connection.on_bytes(Direction::Inbound, &[0x81, 0x02, b'h', b'i'], Instant::now());
//! }
//! println!("{}", monitor.get_counters());
//! ```

pub mod config;
pub mod context;
pub mod endpoints;
pub mod error;
pub mod monitor;
pub mod sink;
pub mod stats;
pub mod template;
pub mod ws;

mod utils;

pub use config::Config;
pub use context::{ConnectionInfo, EventContext, RequestInfo};
pub use error::{Result, StatError};
pub use monitor::{Connection, Delivery, Limits, Monitor};
pub use sink::{FileSink, LogSink, TracingSink};
pub use stats::{CountersSnapshot, TrafficCounters};
pub use template::{compile, CompiledTemplate, LogTemplates, VariableRegistry};
pub use ws::{Direction, FrameDecoder, FrameEvent, Opcode};
