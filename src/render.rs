//! Template rendering.
//!
//! The assemblers only see the [`Render`] trait. [`TemplateRenderer`] is the default
//! implementation with two constructs:
//!
//! - `${name}` substitutes a text attribute;
//! - `${{name: body}}` renders `body` once per element of a list attribute, with the element
//!   pushed as the innermost scope. Lookups fall back to enclosing scopes.
//!
//! `$$` renders a literal `$`. Inside a repeat body the two-character sequence `}}` always ends
//! the body.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unterminated construct starting at byte {0}")]
    Unterminated(usize),
    #[error("bad attribute name at byte {0}")]
    BadName(usize),
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("attribute `{0}` is not a list")]
    NotAList(String),
    #[error("attribute `{0}` is not text")]
    NotAScalar(String),
}

/// Attribute tree handed to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Context {
    Text(String),
    List(Vec<Context>),
    Map(BTreeMap<String, Context>),
}

impl Context {
    pub fn map() -> Self {
        Context::Map(BTreeMap::new())
    }

    /// Builder form of [`Context::set`].
    pub fn with(mut self, key: &str, value: impl Into<Context>) -> Self {
        self.set(key, value);
        self
    }

    /// Set an attribute. No-op unless `self` is a map.
    pub fn set(&mut self, key: &str, value: impl Into<Context>) {
        if let Context::Map(m) = self {
            m.insert(key.to_string(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Context> {
        match self {
            Context::Map(m) => m.get(key),
            _ => None,
        }
    }
}

impl From<String> for Context {
    fn from(s: String) -> Self {
        Context::Text(s)
    }
}

impl From<&str> for Context {
    fn from(s: &str) -> Self {
        Context::Text(s.to_string())
    }
}

impl From<Vec<Context>> for Context {
    fn from(v: Vec<Context>) -> Self {
        Context::List(v)
    }
}

macro_rules! context_from_display {
    ($($t:ty),*) => {
        $(impl From<$t> for Context {
            fn from(v: $t) -> Self {
                Context::Text(v.to_string())
            }
        })*
    };
}

context_from_display!(u8, u16, u32, u64, usize, bool);

/// Renderer contract used by the assemblers.
pub trait Render {
    fn render(&self, template: &str, ctx: &Context) -> Result<String, RenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn new() -> Self {
        TemplateRenderer
    }
}

impl Render for TemplateRenderer {
    fn render(&self, template: &str, ctx: &Context) -> Result<String, RenderError> {
        let mut pos = 0;
        let nodes = parse_nodes(template, &mut pos, None)?;
        let mut out = String::with_capacity(template.len());
        let mut scopes = vec![ctx];
        render_nodes(&nodes, &mut scopes, &mut out)?;
        Ok(out)
    }
}

#[derive(Debug)]
enum Node {
    Text(String),
    Var(String),
    Repeat(String, Vec<Node>),
}

/// Parse until end of input, or until `}}` when inside a repeat opened at `open`.
fn parse_nodes(src: &str, pos: &mut usize, open: Option<usize>) -> Result<Vec<Node>, RenderError> {
    let mut nodes = Vec::new();
    let mut text = String::new();
    while *pos < src.len() {
        let rest = &src[*pos..];
        if open.is_some() && rest.starts_with("}}") {
            *pos += 2;
            flush(&mut text, &mut nodes);
            return Ok(nodes);
        }
        if rest.starts_with("$$") {
            text.push('$');
            *pos += 2;
        } else if rest.starts_with("${{") {
            flush(&mut text, &mut nodes);
            let start = *pos;
            *pos += 3;
            let name = take_name(src, pos, ':')?;
            let body = parse_nodes(src, pos, Some(start))?;
            nodes.push(Node::Repeat(name, body));
        } else if rest.starts_with("${") {
            flush(&mut text, &mut nodes);
            *pos += 2;
            let name = take_name(src, pos, '}')?;
            nodes.push(Node::Var(name));
        } else {
            let c = rest.chars().next().unwrap_or_default();
            text.push(c);
            *pos += c.len_utf8();
        }
    }
    if let Some(start) = open {
        return Err(RenderError::Unterminated(start));
    }
    flush(&mut text, &mut nodes);
    Ok(nodes)
}

fn flush(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

/// Read an attribute name terminated by `end`, consuming the terminator.
fn take_name(src: &str, pos: &mut usize, end: char) -> Result<String, RenderError> {
    let start = *pos;
    let rest = &src[start..];
    let len = rest.find(end).ok_or(RenderError::Unterminated(start))?;
    let name = rest[..len].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RenderError::BadName(start));
    }
    *pos = start + len + end.len_utf8();
    Ok(name.to_string())
}

fn lookup<'a>(scopes: &[&'a Context], name: &str) -> Result<&'a Context, RenderError> {
    scopes
        .iter()
        .rev()
        .find_map(|s| s.get(name))
        .ok_or_else(|| RenderError::UnknownAttribute(name.to_string()))
}

fn render_nodes<'a>(nodes: &[Node], scopes: &mut Vec<&'a Context>, out: &mut String) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Var(name) => match lookup(scopes, name)? {
                Context::Text(t) => out.push_str(t),
                _ => return Err(RenderError::NotAScalar(name.clone())),
            },
            Node::Repeat(name, body) => {
                let items = match lookup(scopes, name)? {
                    Context::List(items) => items,
                    _ => return Err(RenderError::NotAList(name.clone())),
                };
                for item in items {
                    scopes.push(item);
                    let r = render_nodes(body, scopes, out);
                    scopes.pop();
                    r?;
                }
            }
        }
    }
    Ok(())
}
