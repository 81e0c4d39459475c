//! TemplateEngine — a small tagged-AST text templating interpreter.
//!
//! Templates are parsed once into an ordered sequence of literal /
//! variable / conditional / loop nodes and rendered as a pure function of
//! the binding map: same template + bindings ⇒ byte-identical output.
//!
//! Grammar:
//!   `{{ name }}`                 variable substitution, dotted field access
//!   `{{ seq | join(", ") }}`     pipe filters
//!   `{% if cond %}…{% endif %}`  body omitted entirely when cond is falsy
//!   `{% for x in seq %}…{% endfor %}`  one pass per element, `x` bound
//!
//! Falsy is uniform everywhere: absent, null, empty string, empty
//! sequence, or `false`. Unknown variables render as the empty string so
//! templates can reference optional fields defensively.

pub mod catalog;

pub use catalog::TemplateCatalog;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unclosed tag near '{0}'")]
    UnclosedTag(String),

    #[error("unexpected '{{% {0} %}}'")]
    UnexpectedTag(String),

    #[error("missing '{{% {0} %}}'")]
    MissingEnd(&'static str),

    #[error("malformed expression '{0}'")]
    BadExpression(String),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),
}

#[derive(Debug, Clone)]
enum Filter {
    Join(String),
}

#[derive(Debug, Clone)]
enum Node {
    Literal(String),
    Var {
        path: Vec<String>,
        filters: Vec<Filter>,
    },
    If {
        path: Vec<String>,
        body: Vec<Node>,
    },
    For {
        var: String,
        path: Vec<String>,
        body: Vec<Node>,
    },
}

/// A parsed template, reusable across renders.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut tokens = tokenize(source)?.into_iter();
        let nodes = parse_nodes(&mut tokens, None)?;
        Ok(Template { nodes })
    }

    /// Renders the template against a binding map. Pure and deterministic.
    pub fn render(&self, bindings: &Map<String, Value>) -> String {
        let mut out = String::new();
        let mut scope: Vec<(String, Value)> = Vec::new();
        render_nodes(&self.nodes, bindings, &mut scope, &mut out);
        out
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lexing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Token {
    Text(String),
    Expr(String),
    Tag(String),
}

fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while !rest.is_empty() {
        let next_expr = rest.find("{{");
        let next_tag = rest.find("{%");
        let (pos, is_tag) = match (next_expr, next_tag) {
            (Some(e), Some(t)) if t < e => (t, true),
            (Some(e), _) => (e, false),
            (None, Some(t)) => (t, true),
            (None, None) => {
                tokens.push(Token::Text(rest.to_string()));
                break;
            }
        };

        if pos > 0 {
            tokens.push(Token::Text(rest[..pos].to_string()));
        }
        rest = &rest[pos..];

        let close = if is_tag { "%}" } else { "}}" };
        let end = rest[2..]
            .find(close)
            .ok_or_else(|| TemplateError::UnclosedTag(snippet(rest)))?;
        let inner = rest[2..2 + end].trim().to_string();
        tokens.push(if is_tag {
            Token::Tag(inner)
        } else {
            Token::Expr(inner)
        });
        rest = &rest[2 + end + 2..];
    }

    Ok(tokens)
}

fn snippet(s: &str) -> String {
    s.chars().take(24).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

fn parse_nodes(
    tokens: &mut std::vec::IntoIter<Token>,
    terminator: Option<&'static str>,
) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => nodes.push(Node::Literal(text)),
            Token::Expr(expr) => nodes.push(parse_var(&expr)?),
            Token::Tag(tag) => {
                let words: Vec<&str> = tag.split_whitespace().collect();
                match words.as_slice() {
                    ["if", cond] => {
                        let body = parse_nodes(tokens, Some("endif"))?;
                        nodes.push(Node::If {
                            path: parse_path(cond)?,
                            body,
                        });
                    }
                    ["for", var, "in", seq] => {
                        let body = parse_nodes(tokens, Some("endfor"))?;
                        nodes.push(Node::For {
                            var: (*var).to_string(),
                            path: parse_path(seq)?,
                            body,
                        });
                    }
                    [end] if Some(*end) == terminator => return Ok(nodes),
                    _ => return Err(TemplateError::UnexpectedTag(tag)),
                }
            }
        }
    }

    match terminator {
        Some(end) => Err(TemplateError::MissingEnd(end)),
        None => Ok(nodes),
    }
}

fn parse_var(expr: &str) -> Result<Node, TemplateError> {
    let mut parts = expr.split('|').map(str::trim);
    let path = parse_path(parts.next().unwrap_or_default())?;
    let filters = parts.map(parse_filter).collect::<Result<Vec<_>, _>>()?;
    Ok(Node::Var { path, filters })
}

fn parse_path(raw: &str) -> Result<Vec<String>, TemplateError> {
    if raw.is_empty() || raw.split('.').any(|seg| seg.is_empty()) {
        return Err(TemplateError::BadExpression(raw.to_string()));
    }
    Ok(raw.split('.').map(String::from).collect())
}

fn parse_filter(raw: &str) -> Result<Filter, TemplateError> {
    let (name, args) = match raw.find('(') {
        Some(open) => {
            let close = raw
                .rfind(')')
                .ok_or_else(|| TemplateError::BadExpression(raw.to_string()))?;
            (&raw[..open], &raw[open + 1..close])
        }
        None => (raw, ""),
    };

    match name.trim() {
        "join" => {
            let sep = args.trim().trim_matches(|c| c == '"' || c == '\'');
            Ok(Filter::Join(sep.to_string()))
        }
        other => Err(TemplateError::UnknownFilter(other.to_string())),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

fn render_nodes(
    nodes: &[Node],
    bindings: &Map<String, Value>,
    scope: &mut Vec<(String, Value)>,
    out: &mut String,
) {
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Var { path, filters } => {
                let value = resolve(path, bindings, scope);
                out.push_str(&apply_filters(&value, filters));
            }
            Node::If { path, body } => {
                if is_truthy(&resolve(path, bindings, scope)) {
                    render_nodes(body, bindings, scope, out);
                }
            }
            Node::For { var, path, body } => {
                let Value::Array(items) = resolve(path, bindings, scope) else {
                    continue;
                };
                for item in items {
                    // Lexical per-iteration scope: the loop variable never
                    // leaks outside its block.
                    scope.push((var.clone(), item));
                    render_nodes(body, bindings, scope, out);
                    scope.pop();
                }
            }
        }
    }
}

fn resolve(path: &[String], bindings: &Map<String, Value>, scope: &[(String, Value)]) -> Value {
    let head = &path[0];
    let mut current = scope
        .iter()
        .rev()
        .find(|(name, _)| name == head)
        .map(|(_, value)| value.clone())
        .or_else(|| bindings.get(head).cloned())
        .unwrap_or(Value::Null);

    for segment in &path[1..] {
        current = current.get(segment).cloned().unwrap_or(Value::Null);
    }
    current
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Bare sequences/objects need a filter to render meaningfully.
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn apply_filters(value: &Value, filters: &[Filter]) -> String {
    let mut current = value.clone();
    for filter in filters {
        match filter {
            Filter::Join(sep) => {
                let joined = match &current {
                    Value::Array(items) => {
                        items.iter().map(stringify).collect::<Vec<_>>().join(sep)
                    }
                    other => stringify(other),
                };
                current = Value::String(joined);
            }
        }
    }
    stringify(&current)
}
