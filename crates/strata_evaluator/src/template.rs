//! Inline templates.
//!
//! Only variable output tags are understood: `<%= @name %>` reads the
//! unqualified name, `<%= scope.lookupvar('a::b') %>` and
//! `<%= scope['a::b'] %>` accept any variable reference. `<%# ... %>`
//! comments are dropped.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"(?s)<%(=|#)?(.*?)-?%>").expect("template tag pattern");
    static ref INSTANCE_VARIABLE: Regex = Regex::new(r"^@(\w+)$").expect("instance variable pattern");
    static ref LOOKUPVAR: Regex =
        Regex::new(r#"^scope\.lookupvar\(\s*(?:'([^']+)'|"([^"]+)")\s*\)$"#).expect("lookupvar pattern");
    static ref SCOPE_INDEX: Regex =
        Regex::new(r#"^scope\[\s*(?:'([^']+)'|"([^"]+)")\s*\]$"#).expect("scope index pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSyntax {
    /// `@name`
    Instance,
    /// `scope.lookupvar('name')`
    LookupVar,
    /// `scope['name']`
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Variable { name: String, syntax: LookupSyntax },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Split template source into literal text and variable lookups.
    /// The error string describes the offending tag.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut last = 0;
        for captures in TAG.captures_iter(source) {
            let Some(tag) = captures.get(0) else { continue };
            push_text(&mut segments, &source[last..tag.start()]);
            last = tag.end();

            let code = captures.get(2).map_or("", |m| m.as_str()).trim();
            match captures.get(1).map(|m| m.as_str()) {
                Some("#") => {}
                Some(_) => segments.push(parse_expression(code)?),
                None => return Err(format!("only output tags are supported, found '<%{}%>'", code)),
            }
        }
        let rest = &source[last..];
        if rest.contains("<%") {
            return Err("unclosed '<%' tag".to_string());
        }
        push_text(&mut segments, rest);
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn parse_expression(code: &str) -> Result<Segment, String> {
    let variable = |name: &str, syntax| Segment::Variable {
        name: name.to_string(),
        syntax,
    };
    if let Some(captures) = INSTANCE_VARIABLE.captures(code) {
        return Ok(variable(&captures[1], LookupSyntax::Instance));
    }
    for (pattern, syntax) in [(&*LOOKUPVAR, LookupSyntax::LookupVar), (&*SCOPE_INDEX, LookupSyntax::Index)] {
        if let Some(captures) = pattern.captures(code) {
            if let Some(name) = captures.get(1).or_else(|| captures.get(2)) {
                return Ok(variable(name.as_str(), syntax));
            }
        }
    }
    Err(format!("unsupported expression '{}'", code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, syntax: LookupSyntax) -> Segment {
        Segment::Variable {
            name: name.to_string(),
            syntax,
        }
    }

    #[test]
    fn test_instance_variable() {
        let template = Template::parse("Hello <%= @name %>!").unwrap();
        assert_eq!(
            template.segments(),
            &[
                Segment::Text("Hello ".to_string()),
                variable("name", LookupSyntax::Instance),
                Segment::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn test_scope_lookups() {
        let template = Template::parse(r#"<%= scope.lookupvar('a::b') %>/<%= scope["::c"] -%>"#).unwrap();
        assert_eq!(
            template.segments(),
            &[
                variable("a::b", LookupSyntax::LookupVar),
                Segment::Text("/".to_string()),
                variable("::c", LookupSyntax::Index),
            ]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        let template = Template::parse("a<%# note %>b").unwrap();
        assert_eq!(
            template.segments(),
            &[Segment::Text("a".to_string()), Segment::Text("b".to_string())]
        );
    }

    #[test]
    fn test_rejects_code_and_unclosed_tags() {
        assert!(Template::parse("<% if true %>x<% end %>").is_err());
        assert!(Template::parse("<%= @a").is_err());
        assert!(Template::parse("<%= @a + 1 %>").is_err());
    }
}
