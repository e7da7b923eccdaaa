use super::compiler::{CompiledTemplate, Segment};
use crate::context::EventContext;

impl CompiledTemplate {
    /// Render one log line, without a trailing separator.
    pub fn render(&self, ctx: &EventContext<'_>) -> String {
        let mut line = String::with_capacity(self.size_hint);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Variable(variable) => {
                    let value = variable.resolve(ctx);
                    line.push_str(truncate(&value, variable.max_length()));
                }
            }
        }
        line
    }
}

pub fn render(template: &CompiledTemplate, ctx: &EventContext<'_>) -> String {
    template.render(ctx)
}

// cut at a char boundary at or below max_length bytes
fn truncate(value: &str, max_length: usize) -> &str {
    if value.len() <= max_length {
        return value;
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
