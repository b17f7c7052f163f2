//! The manifest parser.
//!
//! A recursive descent parser over the scanner's token stream that builds an
//! arena-allocated AST. Errors are collected as diagnostics; parsing always
//! produces a manifest, skipping to the next statement after an error.

use bumpalo::Bump;
use std::sync::Arc;
use strata_ast::node::*;
use strata_ast::syntax_kind::SyntaxKind;
use strata_core::text::{LineMap, TextSpan};
use strata_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage};
use strata_scanner::Scanner;

/// Maximum recursion depth to prevent stack overflow on deeply nested input.
const MAX_RECURSION_DEPTH: u32 = 200;

/// Move a Vec into the arena as a slice.
fn alloc_vec_in<T>(arena: &Bump, vec: Vec<T>) -> &[T] {
    if vec.is_empty() {
        return &[];
    }
    bumpalo::collections::Vec::from_iter_in(vec, arena).into_bump_slice()
}

/// The parser produces a [`Manifest`] from manifest source text.
pub struct Parser<'a> {
    arena: &'a Bump,
    scanner: Scanner<'a>,
    file_name: Arc<str>,
    line_map: LineMap,
    diagnostics: DiagnosticCollection,
    /// End of the last consumed token, for node spans.
    last_end: u32,
    recursion_depth: u32,
}

impl<'a> Parser<'a> {
    pub fn new(arena: &'a Bump, file_name: &str, source_text: &str) -> Self {
        let text: &'a str = arena.alloc_str(source_text);
        Self {
            arena,
            scanner: Scanner::new(text),
            file_name: Arc::from(file_name),
            line_map: LineMap::new(text),
            diagnostics: DiagnosticCollection::new(),
            last_end: 0,
            recursion_depth: 0,
        }
    }

    /// Parse the whole file. Scanner and parser diagnostics are returned
    /// together, each located in this file.
    pub fn parse_manifest(mut self) -> (Manifest<'a>, DiagnosticCollection) {
        self.next_token();
        let mut statements = Vec::new();
        loop {
            self.parse_statement_list(&mut statements);
            if self.current_token() != SyntaxKind::CloseBraceToken {
                break;
            }
            self.unexpected_token();
            self.next_token();
        }
        let statements = alloc_vec_in(self.arena, statements);

        let mut diagnostics = DiagnosticCollection::new();
        for diagnostic in self.scanner.take_diagnostics() {
            diagnostics.add(self.locate(diagnostic));
        }
        diagnostics.extend(std::mem::take(&mut self.diagnostics));
        diagnostics.sort();

        let manifest = Manifest {
            file_name: self.file_name,
            statements,
            line_map: self.line_map,
        };
        (manifest, diagnostics)
    }

    // ========================================================================
    // Token management
    // ========================================================================

    #[inline]
    fn current_token(&self) -> SyntaxKind {
        self.scanner.token()
    }

    #[inline]
    fn next_token(&mut self) -> SyntaxKind {
        self.last_end = self.token_end();
        self.scanner.scan()
    }

    #[inline]
    fn token_pos(&self) -> u32 {
        self.scanner.token_start() as u32
    }

    #[inline]
    fn token_end(&self) -> u32 {
        self.scanner.token_end() as u32
    }

    /// The current token's text, copied into the arena.
    fn token_text(&self) -> &'a str {
        self.arena.alloc_str(self.scanner.token_value())
    }

    fn peek_token(&mut self) -> SyntaxKind {
        self.scanner.look_ahead(|scanner| scanner.scan())
    }

    fn expect_token(&mut self, kind: SyntaxKind) -> bool {
        if self.current_token() == kind {
            self.next_token();
            true
        } else {
            self.error(&messages::_0_EXPECTED, &[kind.text()]);
            false
        }
    }

    fn optional_token(&mut self, kind: SyntaxKind) -> bool {
        if self.current_token() == kind {
            self.next_token();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start: u32) -> TextSpan {
        TextSpan::from_bounds(start, self.last_end.max(start))
    }

    fn locate(&self, diagnostic: Diagnostic) -> Diagnostic {
        match diagnostic.span {
            Some(span) => diagnostic.at(&self.line_map.source_position(&self.file_name, span)),
            None => diagnostic,
        }
    }

    fn error(&mut self, msg: &DiagnosticMessage, args: &[&str]) {
        let span = TextSpan::from_bounds(self.token_pos(), self.token_end());
        self.error_at(span, msg, args);
    }

    fn error_at(&mut self, span: TextSpan, msg: &DiagnosticMessage, args: &[&str]) {
        let position = self.line_map.source_position(&self.file_name, span);
        self.diagnostics.add(Diagnostic::new(msg, args).at(&position));
    }

    fn unexpected_token(&mut self) {
        let text = match self.current_token() {
            SyntaxKind::EndOfFileToken => "end of file".to_string(),
            SyntaxKind::Unknown => return,
            kind => kind
                .punctuation_text()
                .map(str::to_string)
                .unwrap_or_else(|| self.scanner.token_value().to_string()),
        };
        self.error(&messages::UNEXPECTED_TOKEN_0, &[&text]);
    }

    // ========================================================================
    // Statement parsing
    // ========================================================================

    fn parse_statements(&mut self) -> NodeList<'a, Statement<'a>> {
        let mut statements = Vec::new();
        self.parse_statement_list(&mut statements);
        alloc_vec_in(self.arena, statements)
    }

    fn parse_statement_list(&mut self, statements: &mut Vec<Statement<'a>>) {
        while !matches!(
            self.current_token(),
            SyntaxKind::EndOfFileToken | SyntaxKind::CloseBraceToken
        ) {
            if self.optional_token(SyntaxKind::SemicolonToken) {
                continue;
            }
            let saved_pos = self.scanner.token_start();
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            // Error recovery: if the parser hasn't advanced, skip forward to
            // the next statement-starting token.
            if self.scanner.token_start() == saved_pos {
                self.next_token();
                self.skip_to_next_statement();
            }
        }
    }

    fn skip_to_next_statement(&mut self) {
        loop {
            match self.current_token() {
                SyntaxKind::EndOfFileToken
                | SyntaxKind::CloseBraceToken
                | SyntaxKind::Variable
                | SyntaxKind::ClassKeyword
                | SyntaxKind::DefineKeyword
                | SyntaxKind::NodeKeyword
                | SyntaxKind::IncludeKeyword => return,
                SyntaxKind::SemicolonToken => {
                    self.next_token();
                    return;
                }
                _ => {
                    self.next_token();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Option<Statement<'a>> {
        match self.current_token() {
            SyntaxKind::Variable => self.parse_assignment(),
            SyntaxKind::IncludeKeyword => Some(self.parse_include()),
            SyntaxKind::ClassKeyword => self.parse_class_definition(),
            SyntaxKind::DefineKeyword => self.parse_defined_type_definition(),
            SyntaxKind::NodeKeyword => self.parse_node_definition(),
            SyntaxKind::Name => match self.peek_token() {
                SyntaxKind::OpenBraceToken => self.parse_resource_declaration(),
                SyntaxKind::OpenParenToken => {
                    let call = self.parse_name_expression();
                    Some(Statement::Expression(self.arena.alloc(call)))
                }
                next if is_argument_start(next) => Some(self.parse_statement_call()),
                _ => {
                    self.unexpected_token();
                    None
                }
            },
            _ => {
                self.unexpected_token();
                None
            }
        }
    }

    /// `$x = expr`, `$x += expr`, `$x -= expr`
    fn parse_assignment(&mut self) -> Option<Statement<'a>> {
        let start = self.token_pos();
        let target = Variable {
            span: TextSpan::from_bounds(start, self.token_end()),
            name: self.token_text(),
        };
        self.next_token();

        let operator = match self.current_token() {
            SyntaxKind::EqualsToken => AssignmentOperator::Assign,
            SyntaxKind::PlusEqualsToken => AssignmentOperator::Append,
            SyntaxKind::MinusEqualsToken => AssignmentOperator::Remove,
            _ => {
                self.error(&messages::_0_EXPECTED, &["="]);
                return None;
            }
        };
        let operator_span = TextSpan::from_bounds(self.token_pos(), self.token_end());
        self.next_token();

        let value = self.parse_expression()?;
        Some(Statement::Assignment(Assignment {
            span: self.span_from(start),
            target,
            operator,
            operator_span,
            value: self.arena.alloc(value),
        }))
    }

    /// `include a, b::c, ::d`
    fn parse_include(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        self.next_token();
        let mut classes = Vec::new();
        loop {
            match self.parse_class_reference() {
                Some(reference) => classes.push(reference),
                None => break,
            }
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        Statement::Include(IncludeStatement {
            span: self.span_from(start),
            classes: alloc_vec_in(self.arena, classes),
        })
    }

    /// A class name, bare or quoted.
    fn parse_class_reference(&mut self) -> Option<ClassReference<'a>> {
        match self.current_token() {
            SyntaxKind::Name | SyntaxKind::SingleQuotedString | SyntaxKind::DoubleQuotedString => {
                let reference = ClassReference {
                    span: TextSpan::from_bounds(self.token_pos(), self.token_end()),
                    name: self.token_text(),
                };
                self.next_token();
                Some(reference)
            }
            _ => {
                self.error(&messages::CLASS_NAME_EXPECTED, &[]);
                None
            }
        }
    }

    /// `class name (params) inherits parent { body }`
    fn parse_class_definition(&mut self) -> Option<Statement<'a>> {
        let start = self.token_pos();
        self.next_token();
        let name = self.parse_class_reference()?;
        let parameters = self.parse_parameter_list();
        let parent = if self.optional_token(SyntaxKind::InheritsKeyword) {
            Some(self.parse_class_reference()?)
        } else {
            None
        };
        let body = self.parse_body()?;
        Some(Statement::ClassDefinition(ClassDefinition {
            span: self.span_from(start),
            name,
            parameters,
            parent,
            body,
        }))
    }

    /// `define name (params) { body }`
    fn parse_defined_type_definition(&mut self) -> Option<Statement<'a>> {
        let start = self.token_pos();
        self.next_token();
        let name = self.parse_class_reference()?;
        let parameters = self.parse_parameter_list();
        let body = self.parse_body()?;
        Some(Statement::DefinedTypeDefinition(DefinedTypeDefinition {
            span: self.span_from(start),
            name,
            parameters,
            body,
        }))
    }

    /// `node a, 'b', default inherits parent { body }`
    fn parse_node_definition(&mut self) -> Option<Statement<'a>> {
        let start = self.token_pos();
        self.next_token();
        let mut names = Vec::new();
        loop {
            names.push(self.parse_node_name()?);
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        let parent = if self.optional_token(SyntaxKind::InheritsKeyword) {
            Some(self.parse_node_name()?)
        } else {
            None
        };
        let body = self.parse_body()?;
        Some(Statement::NodeDefinition(NodeDefinition {
            span: self.span_from(start),
            names: alloc_vec_in(self.arena, names),
            parent,
            body,
        }))
    }

    fn parse_node_name(&mut self) -> Option<NodeName<'a>> {
        let span = TextSpan::from_bounds(self.token_pos(), self.token_end());
        let matcher = match self.current_token() {
            SyntaxKind::DefaultKeyword => NodeMatcher::Default,
            SyntaxKind::Name | SyntaxKind::SingleQuotedString | SyntaxKind::DoubleQuotedString => {
                NodeMatcher::Name(self.token_text())
            }
            _ => {
                self.error(&messages::NODE_NAME_EXPECTED, &[]);
                return None;
            }
        };
        self.next_token();
        Some(NodeName { span, matcher })
    }

    /// `($a, $b = expr)`; absent lists are empty.
    fn parse_parameter_list(&mut self) -> NodeList<'a, Parameter<'a>> {
        if !self.optional_token(SyntaxKind::OpenParenToken) {
            return &[];
        }
        let mut parameters = Vec::new();
        while self.current_token() == SyntaxKind::Variable {
            let start = self.token_pos();
            let name = self.token_text();
            self.next_token();
            let default = if self.optional_token(SyntaxKind::EqualsToken) {
                self.parse_expression().map(|expr| &*self.arena.alloc(expr))
            } else {
                None
            };
            parameters.push(Parameter {
                span: self.span_from(start),
                name,
                default,
            });
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        self.expect_token(SyntaxKind::CloseParenToken);
        alloc_vec_in(self.arena, parameters)
    }

    /// `{ statements }`
    fn parse_body(&mut self) -> Option<NodeList<'a, Statement<'a>>> {
        if !self.expect_token(SyntaxKind::OpenBraceToken) {
            return None;
        }
        if self.recursion_depth >= MAX_RECURSION_DEPTH {
            self.unexpected_token();
            return None;
        }
        self.recursion_depth += 1;
        let body = self.parse_statements();
        self.recursion_depth -= 1;
        self.expect_token(SyntaxKind::CloseBraceToken);
        Some(body)
    }

    /// `type { title: attr => value, ...; title2: ... }`
    fn parse_resource_declaration(&mut self) -> Option<Statement<'a>> {
        let start = self.token_pos();
        let type_name = ClassReference {
            span: TextSpan::from_bounds(start, self.token_end()),
            name: self.token_text(),
        };
        self.next_token();
        self.expect_token(SyntaxKind::OpenBraceToken);

        let mut bodies = Vec::new();
        while !matches!(
            self.current_token(),
            SyntaxKind::CloseBraceToken | SyntaxKind::EndOfFileToken
        ) {
            bodies.push(self.parse_resource_body()?);
            if !self.optional_token(SyntaxKind::SemicolonToken) {
                break;
            }
        }
        self.expect_token(SyntaxKind::CloseBraceToken);
        Some(Statement::ResourceDeclaration(ResourceDeclaration {
            span: self.span_from(start),
            type_name,
            bodies: alloc_vec_in(self.arena, bodies),
        }))
    }

    fn parse_resource_body(&mut self) -> Option<ResourceBody<'a>> {
        let start = self.token_pos();
        let title = self.parse_expression()?;
        self.expect_token(SyntaxKind::ColonToken);

        let mut attributes = Vec::new();
        while self.current_token() == SyntaxKind::Name || self.current_token().is_keyword() {
            let attr_start = self.token_pos();
            let name = self.token_text();
            self.next_token();
            self.expect_token(SyntaxKind::EqualsGreaterThanToken);
            let value = self.parse_expression()?;
            attributes.push(AttributeOperation {
                span: self.span_from(attr_start),
                name,
                value: self.arena.alloc(value),
            });
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        Some(ResourceBody {
            span: self.span_from(start),
            title: self.arena.alloc(title),
            attributes: alloc_vec_in(self.arena, attributes),
        })
    }

    /// `notice 'a', $b` without parentheses.
    fn parse_statement_call(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        let function = self.token_text();
        self.next_token();
        let mut arguments = Vec::new();
        while let Some(arg) = self.parse_expression() {
            arguments.push(arg);
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        let call = Expression::Call(CallExpression {
            span: self.span_from(start),
            function,
            arguments: alloc_vec_in(self.arena, arguments),
        });
        Statement::Expression(self.arena.alloc(call))
    }

    // ========================================================================
    // Expression parsing
    // ========================================================================

    fn parse_expression(&mut self) -> Option<Expression<'a>> {
        let start = self.token_pos();
        let span = TextSpan::from_bounds(start, self.token_end());
        let expr = match self.current_token() {
            SyntaxKind::SingleQuotedString => {
                let value = self.token_text();
                self.next_token();
                Expression::String(StringLiteral { span, value })
            }
            SyntaxKind::DoubleQuotedString => {
                let raw = self.scanner.token_value().to_string();
                self.next_token();
                self.parse_double_quoted(span, &raw)
            }
            SyntaxKind::IntegerLiteral => {
                let value = match self.scanner.token_value().parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        let text = self.scanner.token_value().to_string();
                        self.error(&messages::UNEXPECTED_TOKEN_0, &[&text]);
                        0
                    }
                };
                self.next_token();
                Expression::Integer(IntegerLiteral { span, value })
            }
            SyntaxKind::TrueKeyword | SyntaxKind::FalseKeyword => {
                let value = self.current_token() == SyntaxKind::TrueKeyword;
                self.next_token();
                Expression::Boolean(BooleanLiteral { span, value })
            }
            SyntaxKind::UndefKeyword => {
                self.next_token();
                Expression::Undef(span)
            }
            SyntaxKind::Variable => {
                let name = self.token_text();
                self.next_token();
                Expression::Variable(Variable { span, name })
            }
            SyntaxKind::OpenBracketToken => self.parse_array()?,
            SyntaxKind::Name => self.parse_name_expression(),
            _ => {
                self.error(&messages::EXPRESSION_EXPECTED, &[]);
                return None;
            }
        };
        Some(expr)
    }

    /// A bare word, or a call when followed by `(`.
    fn parse_name_expression(&mut self) -> Expression<'a> {
        let start = self.token_pos();
        let span = TextSpan::from_bounds(start, self.token_end());
        let value = self.token_text();
        self.next_token();
        if !self.optional_token(SyntaxKind::OpenParenToken) {
            return Expression::BareWord(BareWord { span, value });
        }
        let mut arguments = Vec::new();
        while self.current_token() != SyntaxKind::CloseParenToken {
            match self.parse_expression() {
                Some(arg) => arguments.push(arg),
                None => break,
            }
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        self.expect_token(SyntaxKind::CloseParenToken);
        Expression::Call(CallExpression {
            span: self.span_from(start),
            function: value,
            arguments: alloc_vec_in(self.arena, arguments),
        })
    }

    fn parse_array(&mut self) -> Option<Expression<'a>> {
        let start = self.token_pos();
        if self.recursion_depth >= MAX_RECURSION_DEPTH {
            self.unexpected_token();
            return None;
        }
        self.next_token();
        self.recursion_depth += 1;
        let mut elements = Vec::new();
        while self.current_token() != SyntaxKind::CloseBracketToken {
            match self.parse_expression() {
                Some(element) => elements.push(element),
                None => break,
            }
            if !self.optional_token(SyntaxKind::CommaToken) {
                break;
            }
        }
        self.recursion_depth -= 1;
        self.expect_token(SyntaxKind::CloseBracketToken);
        Some(Expression::Array(ArrayLiteral {
            span: self.span_from(start),
            elements: alloc_vec_in(self.arena, elements),
        }))
    }

    /// Split the raw content of a double-quoted string into text and
    /// variables. Escapes: `\n \t \" \\ \$`; any other backslash is kept.
    fn parse_double_quoted(&mut self, span: TextSpan, raw: &str) -> Expression<'a> {
        // Content starts after the opening quote.
        let base = span.start + 1;
        let bytes = raw.as_bytes();
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if i + 1 < bytes.len() => {
                    match bytes[i + 1] {
                        b'n' => text.push('\n'),
                        b't' => text.push('\t'),
                        b'"' => text.push('"'),
                        b'\\' => text.push('\\'),
                        b'$' => text.push('$'),
                        _ => {
                            text.push('\\');
                            i += 1;
                            continue;
                        }
                    }
                    i += 2;
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    let open = i;
                    match raw[i + 2..].find('}') {
                        Some(offset) => {
                            let inner = raw[i + 2..i + 2 + offset].trim();
                            let name = inner.strip_prefix('$').unwrap_or(inner);
                            let end = i + 2 + offset + 1;
                            self.flush_text(&mut parts, &mut text);
                            parts.push(StringPart::Variable(Variable {
                                span: TextSpan::from_bounds(base + open as u32, base + end as u32),
                                name: self.arena.alloc_str(name),
                            }));
                            i = end;
                        }
                        None => {
                            let at = TextSpan::from_bounds(base + open as u32, base + bytes.len() as u32);
                            self.error_at(at, &messages::UNTERMINATED_INTERPOLATION, &[]);
                            text.push_str(&raw[i..]);
                            i = bytes.len();
                        }
                    }
                }
                b'$' if variable_length(&raw[i + 1..]) > 0 => {
                    let length = variable_length(&raw[i + 1..]);
                    let name = &raw[i + 1..i + 1 + length];
                    self.flush_text(&mut parts, &mut text);
                    parts.push(StringPart::Variable(Variable {
                        span: TextSpan::from_bounds(base + i as u32, base + (i + 1 + length) as u32),
                        name: self.arena.alloc_str(name),
                    }));
                    i += 1 + length;
                }
                _ => {
                    // Copy one full character.
                    let ch_len = raw[i..].chars().next().map_or(1, char::len_utf8);
                    text.push_str(&raw[i..i + ch_len]);
                    i += ch_len;
                }
            }
        }

        if parts.is_empty() {
            return Expression::String(StringLiteral {
                span,
                value: self.arena.alloc_str(&text),
            });
        }
        self.flush_text(&mut parts, &mut text);
        Expression::Interpolated(InterpolatedString {
            span,
            parts: alloc_vec_in(self.arena, parts),
        })
    }

    fn flush_text(&self, parts: &mut Vec<StringPart<'a>>, text: &mut String) {
        if !text.is_empty() {
            parts.push(StringPart::Text(self.arena.alloc_str(text)));
            text.clear();
        }
    }
}

/// Length of an interpolated `$name` / `$::name` / `$a::b` reference that
/// starts at the beginning of `text` (after the `$`), or 0.
fn variable_length(text: &str) -> usize {
    let bytes = text.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let mut i = 0;
    if bytes.starts_with(b"::") {
        i = 2;
    }
    let word_start = i;
    loop {
        while i < bytes.len() && is_word(bytes[i]) {
            i += 1;
        }
        if i + 2 < bytes.len() && bytes[i] == b':' && bytes[i + 1] == b':' && is_word(bytes[i + 2]) {
            i += 2;
        } else {
            break;
        }
    }
    if i == word_start {
        0
    } else {
        i
    }
}

fn is_argument_start(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::SingleQuotedString
            | SyntaxKind::DoubleQuotedString
            | SyntaxKind::IntegerLiteral
            | SyntaxKind::Variable
            | SyntaxKind::OpenBracketToken
            | SyntaxKind::TrueKeyword
            | SyntaxKind::FalseKeyword
            | SyntaxKind::UndefKeyword
    )
}
