//! Log line templates: `"$time_local: packet received from $ws_packet_source"`
//! is compiled once into literal and variable segments, then rendered per
//! event.

mod compiler;
mod evaluator;
mod variables;

use serde::Deserialize;

pub use compiler::{compile, CompiledTemplate, Segment};
pub use evaluator::render;
pub use variables::{Resolver, Variable, VariableRegistry, UNKNOWN_VAR};

pub const DEFAULT_LOG_FORMAT: &str = "$time_local: packet received from $ws_packet_source";
pub const DEFAULT_OPEN_LOG_FORMAT: &str = "websocket connection opened";
pub const DEFAULT_CLOSE_LOG_FORMAT: &str = "websocket connection closed";

/// Format strings as they appear in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogFormats {
    pub default: Option<String>,
    pub open: Option<String>,
    pub close: Option<String>,
}

/// The three compiled templates a monitor renders with.
#[derive(Debug, Clone)]
pub struct LogTemplates {
    /// One line per observed frame.
    pub frame: CompiledTemplate,
    pub open: CompiledTemplate,
    pub close: CompiledTemplate,
}
impl LogTemplates {
    pub fn compile(formats: &LogFormats, registry: &VariableRegistry) -> Self {
        LogTemplates {
            frame: compile(
                formats.default.as_deref().unwrap_or(DEFAULT_LOG_FORMAT),
                registry,
            ),
            open: compile(
                formats.open.as_deref().unwrap_or(DEFAULT_OPEN_LOG_FORMAT),
                registry,
            ),
            close: compile(
                formats.close.as_deref().unwrap_or(DEFAULT_CLOSE_LOG_FORMAT),
                registry,
            ),
        }
    }
}
impl Default for LogTemplates {
    fn default() -> Self {
        Self::compile(&LogFormats::default(), &VariableRegistry::builtin())
    }
}
