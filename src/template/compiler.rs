use super::variables::{Variable, VariableRegistry};

#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Variable(Variable),
}

/// A format string split once into literal text and variable references.
///
/// Immutable after [`compile`]; share it freely between connections.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub(crate) segments: Vec<Segment>,
    pub(crate) size_hint: usize,
}
impl CompiledTemplate {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
    /// Upper bound of a rendered line, in bytes.
    pub fn size_hint(&self) -> usize {
        self.size_hint
    }
}

/// Compile `format` against `registry`.
///
/// Each `$` is matched against the longest registered name that follows it;
/// a `$` that matches nothing stays in the output as literal text.
pub fn compile(format: &str, registry: &VariableRegistry) -> CompiledTemplate {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = format;

    while let Some(at) = rest.find('$') {
        literal.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        match registry.longest_match(after) {
            Some(variable) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                rest = &after[variable.name().len()..];
                segments.push(Segment::Variable(variable.clone()));
            }
            None => {
                literal.push('$');
                rest = after;
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    let size_hint = segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => text.len(),
            Segment::Variable(variable) => variable.max_length(),
        })
        .sum();
    CompiledTemplate {
        segments,
        size_hint,
    }
}
