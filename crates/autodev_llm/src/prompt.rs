//! Prompt templates with `{name}` placeholders.
//!
//! `{{` and `}}` render as literal braces so JSON examples can be embedded
//! in a prompt. A `{` that does not open a valid placeholder is kept as is.

use std::collections::BTreeMap;

use crate::error::{LlmError, LlmResult};

/// Variables substituted into a template.
pub type PromptVars = BTreeMap<String, String>;

/// Build [`PromptVars`] from key/value pairs.
pub fn vars<K, V, I>(pairs: I) -> PromptVars
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let segments = parse(&source);
        Self { source, segments }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in &self.segments {
            if let Segment::Var(name) = segment {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    pub fn render(&self, vars: &PromptVars) -> LlmResult<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(name) => {
                    let value = vars
                        .get(name)
                        .ok_or_else(|| LlmError::MissingVariable(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse(source: &str) -> Vec<Segment> {
    let chars: Vec<char> = source.chars().collect();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if (c == '{' && next == Some('{')) || (c == '}' && next == Some('}')) {
            text.push(c);
            i += 2;
            continue;
        }

        if c == '{' && next.is_some_and(is_ident_start) {
            let mut end = i + 1;
            while end < chars.len() && is_ident(chars[end]) {
                end += 1;
            }
            if chars.get(end) == Some(&'}') {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Var(chars[i + 1..end].iter().collect()));
                i = end + 1;
                continue;
            }
        }

        text.push(c);
        i += 1;
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        let template = PromptTemplate::new("Analyze {description} for {user}.");
        let rendered = template
            .render(&vars([("description", "a calculator"), ("user", "me")]))
            .unwrap();
        assert_eq!(rendered, "Analyze a calculator for me.");
        assert_eq!(template.variables(), vec!["description", "user"]);
    }

    #[test]
    fn test_missing_variable() {
        let template = PromptTemplate::new("Code: {code}");
        let err = template.render(&PromptVars::new()).unwrap_err();
        assert!(matches!(err, LlmError::MissingVariable(name) if name == "code"));
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::new(r#"Return {{"id": "{id}"}}"#);
        let rendered = template.render(&vars([("id", "REQ-1")])).unwrap();
        assert_eq!(rendered, r#"Return {"id": "REQ-1"}"#);
    }

    #[test]
    fn test_lone_braces_are_literal() {
        let template = PromptTemplate::new("fn main() { } and {not closed");
        assert!(template.variables().is_empty());
        assert_eq!(
            template.render(&PromptVars::new()).unwrap(),
            "fn main() { } and {not closed"
        );
    }
}
