use std::fmt;
use std::sync::Arc;

use crate::context::{EventContext, RequestInfo};

/// Rendered in place of a value that does not apply to the current event.
pub const UNKNOWN_VAR: &str = "???";

/// Length bound for decimal `u64`/`i64` values.
const NUMBER_LEN: usize = 20;
const REQUEST_VAR_LEN: usize = 60;
pub const PAYLOAD_CONTENT_LEN: usize = 4 * 1024;

/// `Mon, 23 Oct 2017 11:27:42 GMT`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub type Resolver = Arc<dyn Fn(&EventContext<'_>) -> String + Send + Sync>;

/// A named template variable: `$name` is replaced by the resolver's output,
/// cut to `max_length` bytes.
#[derive(Clone)]
pub struct Variable {
    name: String,
    max_length: usize,
    resolver: Resolver,
}
impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn max_length(&self) -> usize {
        self.max_length
    }
    pub fn resolve(&self, ctx: &EventContext<'_>) -> String {
        (self.resolver)(ctx)
    }
}
impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("max_length", &self.max_length)
            .finish()
    }
}

#[derive(Clone, Default, Debug)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` (with or without the leading `$`). A later
    /// registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: &str, max_length: usize, resolver: F) -> &mut Self
    where
        F: Fn(&EventContext<'_>) -> String + Send + Sync + 'static,
    {
        let name = name.trim_start_matches('$').to_string();
        self.variables.retain(|variable| variable.name != name);
        self.variables.push(Variable {
            name,
            max_length,
            resolver: Arc::new(resolver),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        let name = name.trim_start_matches('$');
        self.variables.iter().find(|variable| variable.name == name)
    }

    /// The longest registered name that `text` starts with.
    pub fn longest_match(&self, text: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .filter(|variable| !variable.name.is_empty() && text.starts_with(&variable.name))
            .max_by_key(|variable| variable.name.len())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Registry with every builtin `$ws_*` and request variable.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register("ws_opcode", 4, |ctx| match ctx.frame {
                Some(frame) => frame.opcode().to_string(),
                None => UNKNOWN_VAR.to_string(),
            })
            .register("ws_payload_size", NUMBER_LEN, |ctx| match ctx.frame {
                Some(frame) => frame.payload_length().to_string(),
                None => UNKNOWN_VAR.to_string(),
            })
            .register("ws_payload_full_size", NUMBER_LEN, |ctx| match ctx.frame {
                Some(frame) => frame.frame_size.to_string(),
                None => UNKNOWN_VAR.to_string(),
            })
            .register("ws_payload_full_content", PAYLOAD_CONTENT_LEN, |ctx| {
                match ctx.frame {
                    Some(frame) => String::from_utf8_lossy(&frame.payload).into_owned(),
                    None => String::new(),
                }
            })
            .register("ws_packet_source", 8, |ctx| match ctx.direction {
                Some(direction) => direction.source().to_string(),
                None => UNKNOWN_VAR.to_string(),
            })
            .register("ws_conn_age", NUMBER_LEN, |ctx| {
                ctx.connection.age(ctx.now).as_secs().to_string()
            })
            .register("time_local", 29, |ctx| {
                ctx.wall_clock.format(HTTP_DATE_FORMAT).to_string()
            })
            .register("request_id", 32, |ctx| ctx.connection.id.clone())
            .register("remote_ip", 45, |ctx| {
                request_value(RequestField::RemoteIp, &ctx.connection.request)
            });
        for (name, field) in REQUEST_VARS {
            let field = *field;
            registry.register(name, REQUEST_VAR_LEN, move |ctx| {
                request_value(field, &ctx.connection.request)
            });
        }
        registry
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestField {
    Request,
    Uri,
    RemoteUser,
    RemoteAddr,
    RemotePort,
    RemoteIp,
    ServerAddr,
    ServerPort,
    UpstreamAddr,
}

const REQUEST_VARS: &[(&str, RequestField)] = &[
    ("request", RequestField::Request),
    ("uri", RequestField::Uri),
    ("remote_user", RequestField::RemoteUser),
    ("remote_addr", RequestField::RemoteAddr),
    ("remote_port", RequestField::RemotePort),
    ("server_addr", RequestField::ServerAddr),
    ("server_port", RequestField::ServerPort),
    ("upstream_addr", RequestField::UpstreamAddr),
];

fn request_value(field: RequestField, request: &RequestInfo) -> String {
    let value = match field {
        RequestField::Request => request.request.clone(),
        RequestField::Uri => request.uri.clone(),
        RequestField::RemoteUser => request.remote_user.clone(),
        RequestField::RemoteAddr | RequestField::RemoteIp => {
            request.remote_addr.map(|addr| addr.ip().to_string())
        }
        RequestField::RemotePort => request.remote_addr.map(|addr| addr.port().to_string()),
        RequestField::ServerAddr => request.server_addr.map(|addr| addr.ip().to_string()),
        RequestField::ServerPort => request.server_addr.map(|addr| addr.port().to_string()),
        RequestField::UpstreamAddr => request.upstream_addr.clone(),
    };
    value.unwrap_or_else(|| UNKNOWN_VAR.to_string())
}
