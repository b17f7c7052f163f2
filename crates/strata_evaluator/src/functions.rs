//! Built-in functions.

use crate::definitions::DefinitionIndex;
use crate::error::EvalError;
use crate::template::{LookupSyntax, Segment, Template};
use strata_core::text::SourcePosition;
use strata_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use strata_scope::{ScopeError, ScopeId, ScopeRegistry, Value};
use tracing::{debug, info};

/// What a function call can see: the calling scope and the compilation
/// state it may read or report into.
pub(crate) struct CallContext<'c, 'a> {
    pub registry: &'c ScopeRegistry,
    pub definitions: &'c DefinitionIndex<'a>,
    pub diagnostics: &'c mut DiagnosticCollection,
    pub notices: &'c mut Vec<String>,
    pub scope: ScopeId,
    pub position: SourcePosition,
}

pub(crate) fn call(name: &str, arguments: Vec<Value>, cx: &mut CallContext<'_, '_>) -> Result<Value, EvalError> {
    match name {
        "inline_template" => inline_template(&arguments, cx),
        "notice" => Ok(notice(&arguments, cx)),
        "defined" => defined(&arguments, cx),
        _ => Err(EvalError::UnknownFunction {
            name: name.to_string(),
            position: Some(cx.position.clone()),
        }),
    }
}

/// Render each argument as a template and concatenate the results.
fn inline_template(arguments: &[Value], cx: &mut CallContext<'_, '_>) -> Result<Value, EvalError> {
    if arguments.is_empty() {
        return Err(invalid_argument("inline_template", "expected at least one template", cx));
    }
    let mut output = String::new();
    for argument in arguments {
        let Some(source) = argument.as_str() else {
            return Err(invalid_argument(
                "inline_template",
                &format!("expected a string, got '{}'", argument),
                cx,
            ));
        };
        let template = Template::parse(source).map_err(|reason| EvalError::InvalidTemplate {
            reason,
            position: Some(cx.position.clone()),
        })?;
        render(&template, cx, &mut output)?;
    }
    Ok(Value::String(output))
}

fn render(template: &Template, cx: &mut CallContext<'_, '_>, output: &mut String) -> Result<(), EvalError> {
    let resolver = cx.registry.resolver();
    for segment in template.segments() {
        match segment {
            Segment::Text(text) => output.push_str(text),
            Segment::Variable { name, syntax } => {
                let lookup = resolver
                    .resolve(cx.scope, name)
                    .map_err(|err| err.or_position(Some(&cx.position)))?;
                match lookup.value() {
                    Some(value) => output.push_str(&value.to_interpolated()),
                    None => {
                        debug!(variable = %name, ?syntax, "undefined variable in template");
                        let shown = match syntax {
                            LookupSyntax::Instance => format!("@{}", name),
                            LookupSyntax::LookupVar | LookupSyntax::Index => name.clone(),
                        };
                        let diagnostic = Diagnostic::new(&messages::UNDEFINED_VARIABLE_IN_TEMPLATE, &[shown.as_str()]);
                        cx.diagnostics.add(diagnostic.at(&cx.position));
                    }
                }
            }
        }
    }
    Ok(())
}

fn notice(arguments: &[Value], cx: &mut CallContext<'_, '_>) -> Value {
    let message = arguments
        .iter()
        .map(Value::to_interpolated)
        .collect::<Vec<_>>()
        .join(" ");
    info!(scope = %cx.registry.scope(cx.scope).label(), "{}", message);
    cx.notices.push(message);
    Value::Undef
}

/// `defined('$var')` asks whether a variable is bound; any other string asks
/// whether a class or defined type of that name exists. True when any
/// argument is defined.
fn defined(arguments: &[Value], cx: &mut CallContext<'_, '_>) -> Result<Value, EvalError> {
    if arguments.is_empty() {
        return Err(invalid_argument("defined", "expected at least one argument", cx));
    }
    for argument in arguments {
        let Some(name) = argument.as_str() else {
            return Err(invalid_argument(
                "defined",
                &format!("expected a string, got '{}'", argument),
                cx,
            ));
        };
        let found = match name.strip_prefix('$') {
            Some(variable) => match cx.registry.resolver().is_bound(cx.scope, variable) {
                Ok(bound) => bound,
                Err(ScopeError::UnknownClass { .. }) => false,
                Err(err) => return Err(err.or_position(Some(&cx.position)).into()),
            },
            None => {
                let definitions = cx.definitions;
                cx.registry
                    .qualify_class(name, cx.scope, |candidate| {
                        definitions.class(candidate).is_some() || definitions.defined_type(candidate).is_some()
                    })
                    .is_some()
            }
        };
        if found {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

fn invalid_argument(function: &str, reason: &str, cx: &CallContext<'_, '_>) -> EvalError {
    EvalError::InvalidArgument {
        function: function.to_string(),
        reason: reason.to_string(),
        position: Some(cx.position.clone()),
    }
}
