//! Server-wide monitor and the per-connection state it hands out.
//!
//! A [`Monitor`] owns the shared [`TrafficCounters`], the compiled log
//! templates and the log sink. Each proxied websocket gets a [`Connection`]
//! holding one [`FrameDecoder`] per direction; the transport feeds it bytes
//! through [`Connection::on_bytes`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::context::{ConnectionInfo, EventContext, RequestInfo};
use crate::sink::LogSink;
use crate::stats::{ConnectionState, ConnectionTracker, CountersSnapshot, TrafficCounters};
use crate::template::{CompiledTemplate, LogTemplates};
use crate::ws::consts::CLOSE_CONNECTION_AGED;
use crate::ws::decoder::DEFAULT_CAPTURE_LIMIT;
use crate::ws::{encode_close_frame, Direction, FrameDecoder, FrameEvent};

pub const AGED_REASON: &str = "Connection is Aged";

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_connections: Option<u64>,
    pub max_age: Option<Duration>,
    pub payload_capture_limit: usize,
}
impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_connections: None,
            max_age: None,
            payload_capture_limit: DEFAULT_CAPTURE_LIMIT,
        }
    }
}

pub struct Monitor {
    counters: TrafficCounters,
    templates: LogTemplates,
    sink: Arc<dyn LogSink>,
    limits: Limits,
}

impl Monitor {
    pub fn new(templates: LogTemplates, sink: Arc<dyn LogSink>, limits: Limits) -> Self {
        Monitor {
            counters: TrafficCounters::new(),
            templates,
            sink,
            limits,
        }
    }

    pub fn counters(&self) -> &TrafficCounters {
        &self.counters
    }

    pub fn get_counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Start tracking an accepted upgrade. The connection holds a slot in
    /// the active gauge from here until it is closed; `None` means the
    /// connection limit is reached.
    pub fn open(self: &Arc<Self>, request: RequestInfo, now: Instant) -> Option<Arc<Connection>> {
        if !self.counters.try_connection_opened(self.limits.max_connections) {
            return None;
        }
        let info = ConnectionInfo::new(request, now);
        let capture = self.limits.payload_capture_limit;
        Some(Arc::new(Connection {
            monitor: Arc::clone(self),
            tracker: Mutex::new(ConnectionTracker::new(now, self.limits.max_age)),
            inbound: Mutex::new(FrameDecoder::with_capture_limit(capture)),
            outbound: Mutex::new(FrameDecoder::with_capture_limit(capture)),
            info,
        }))
    }

    fn log(&self, template: &CompiledTemplate, ctx: &EventContext<'_>) {
        self.sink.write_line(&template.render(ctx));
    }
}

/// What happened to one delivered chunk.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Frames completed inside the chunk, possibly none.
    Observed(Vec<FrameEvent>),
    /// The connection reached its age limit. The chunk was not observed and
    /// `close_frame` should be written to the client.
    Expired { close_frame: Vec<u8> },
    /// The connection is not active; the chunk was not observed.
    Ignored,
}
impl Delivery {
    pub fn frames(&self) -> &[FrameEvent] {
        match self {
            Delivery::Observed(frames) => frames,
            _ => &[],
        }
    }
}

pub struct Connection {
    monitor: Arc<Monitor>,
    info: ConnectionInfo,
    tracker: Mutex<ConnectionTracker>,
    inbound: Mutex<FrameDecoder>,
    outbound: Mutex<FrameDecoder>,
}

impl Connection {
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn state(&self) -> ConnectionState {
        self.tracker.lock().state()
    }

    /// Upstream connected: log the open line.
    pub fn activate(&self, now: Instant) {
        if !self.tracker.lock().activate() {
            return;
        }
        info!(connection_id = %self.info.id, "websocket connection opened");
        let ctx = EventContext::lifecycle(&self.info, now);
        self.monitor.log(&self.monitor.templates.open, &ctx);
    }

    /// Observe `bytes` travelling in `direction`.
    pub fn on_bytes(&self, direction: Direction, bytes: &[u8], now: Instant) -> Delivery {
        {
            let mut tracker = self.tracker.lock();
            if tracker.state() != ConnectionState::Active {
                return Delivery::Ignored;
            }
            if tracker.check_age(now) {
                info!(connection_id = %self.info.id, "websocket connection aged out");
                return Delivery::Expired {
                    close_frame: encode_close_frame(CLOSE_CONNECTION_AGED, AGED_REASON),
                };
            }
        }

        let counters = self.monitor.counters.direction(direction);
        counters.record_bytes(bytes.len() as u64);
        let frames = self.decoder(direction).lock().decode_chunk(bytes);
        for frame in &frames {
            counters.record_frame(frame.payload_length());
            debug!(
                connection_id = %self.info.id,
                direction = direction.source(),
                opcode = %frame.opcode(),
                payload = frame.payload_length(),
                "websocket frame"
            );
            let ctx = EventContext::frame(&self.info, direction, frame, now);
            self.monitor.log(&self.monitor.templates.frame, &ctx);
        }
        Delivery::Observed(frames)
    }

    /// Close the connection. The first call releases its slot in the active
    /// gauge; the close line is logged only if the connection was activated.
    pub fn close(&self, now: Instant) {
        let previous = match self.tracker.lock().close() {
            Some(previous) => previous,
            None => return,
        };
        self.monitor.counters.connection_closed();
        if previous == ConnectionState::Opening {
            return;
        }
        info!(connection_id = %self.info.id, "websocket connection closed");
        let ctx = EventContext::lifecycle(&self.info, now);
        self.monitor.log(&self.monitor.templates.close, &ctx);
    }

    fn decoder(&self, direction: Direction) -> &Mutex<FrameDecoder> {
        match direction {
            Direction::Inbound => &self.inbound,
            Direction::Outbound => &self.outbound,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close(Instant::now());
    }
}
