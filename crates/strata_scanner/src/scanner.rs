//! The manifest scanner.
//!
//! Converts source text into tokens that the parser consumes. Positions are
//! byte offsets into the original text.

use memchr::{memchr, memchr2, memmem};
use strata_ast::syntax_kind::SyntaxKind;
use strata_core::text::TextSpan;
use strata_diagnostics::{messages, Diagnostic, DiagnosticCollection};

/// Saved scanner state for lookahead.
#[derive(Debug, Clone)]
pub struct ScannerState {
    pos: usize,
    token_start: usize,
    token: SyntaxKind,
    token_value: String,
}

pub struct Scanner<'s> {
    text: &'s str,
    bytes: &'s [u8],
    /// Current position in the text.
    pos: usize,
    /// Start of the current token (after leading trivia).
    token_start: usize,
    token: SyntaxKind,
    token_value: String,
    diagnostics: DiagnosticCollection,
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[inline]
fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

impl<'s> Scanner<'s> {
    pub fn new(text: &'s str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            token_start: 0,
            token: SyntaxKind::Unknown,
            token_value: String::new(),
            diagnostics: DiagnosticCollection::new(),
        }
    }

    pub fn text(&self) -> &'s str {
        self.text
    }

    pub fn look_ahead<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let state = self.save_state();
        let result = f(self);
        self.restore_state(state);
        result
    }

    pub fn save_state(&self) -> ScannerState {
        ScannerState {
            pos: self.pos,
            token_start: self.token_start,
            token: self.token,
            token_value: self.token_value.clone(),
        }
    }

    pub fn restore_state(&mut self, state: ScannerState) {
        self.pos = state.pos;
        self.token_start = state.token_start;
        self.token = state.token;
        self.token_value = state.token_value;
    }

    #[inline]
    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    #[inline]
    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    #[inline]
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    #[inline]
    pub fn token_end(&self) -> usize {
        self.pos
    }

    pub fn token_span(&self) -> TextSpan {
        TextSpan::from_bounds(self.token_start as u32, self.pos as u32)
    }

    pub fn diagnostics(&self) -> &DiagnosticCollection {
        &self.diagnostics
    }

    /// Take the accumulated diagnostics, leaving an empty collection.
    pub fn take_diagnostics(&mut self) -> DiagnosticCollection {
        std::mem::take(&mut self.diagnostics)
    }

    // ========================================================================
    // Core scanning
    // ========================================================================

    #[inline]
    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&mut self, start: usize, message: &strata_diagnostics::DiagnosticMessage, args: &[&str]) {
        let mut diagnostic = Diagnostic::new(message, args);
        diagnostic.span = Some(TextSpan::from_bounds(start as u32, self.pos as u32));
        self.diagnostics.add(diagnostic);
    }

    /// Skip whitespace, `#` line comments and `/* */` block comments.
    fn skip_trivia(&mut self) {
        while let Some(b) = self.byte_at(0) {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'#' => {
                    self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
                        Some(offset) => self.pos + offset + 1,
                        None => self.bytes.len(),
                    };
                }
                b'/' if self.byte_at(1) == Some(b'*') => {
                    let body = self.pos + 2;
                    self.pos = match memmem::find(&self.bytes[body..], b"*/") {
                        Some(offset) => body + offset + 2,
                        None => self.bytes.len(),
                    };
                }
                _ => return,
            }
        }
    }

    /// Scan the next token and return its kind.
    pub fn scan(&mut self) -> SyntaxKind {
        self.token_value.clear();
        self.skip_trivia();
        self.token_start = self.pos;

        let Some(b) = self.byte_at(0) else {
            self.token = SyntaxKind::EndOfFileToken;
            return self.token;
        };

        self.token = match b {
            b'{' => self.single(SyntaxKind::OpenBraceToken),
            b'}' => self.single(SyntaxKind::CloseBraceToken),
            b'(' => self.single(SyntaxKind::OpenParenToken),
            b')' => self.single(SyntaxKind::CloseParenToken),
            b'[' => self.single(SyntaxKind::OpenBracketToken),
            b']' => self.single(SyntaxKind::CloseBracketToken),
            b',' => self.single(SyntaxKind::CommaToken),
            b';' => self.single(SyntaxKind::SemicolonToken),
            b'=' => match self.byte_at(1) {
                Some(b'>') => self.double(SyntaxKind::EqualsGreaterThanToken),
                _ => self.single(SyntaxKind::EqualsToken),
            },
            b'+' if self.byte_at(1) == Some(b'=') => self.double(SyntaxKind::PlusEqualsToken),
            b'-' if self.byte_at(1) == Some(b'=') => self.double(SyntaxKind::MinusEqualsToken),
            b'-' if self.byte_at(1).is_some_and(|b| b.is_ascii_digit()) => self.scan_integer(),
            b':' if self.byte_at(1) == Some(b':') && self.byte_at(2).is_some_and(is_name_start) => {
                self.scan_name()
            }
            b':' => self.single(SyntaxKind::ColonToken),
            b'$' => self.scan_variable(),
            b'\'' => self.scan_single_quoted(),
            b'"' => self.scan_double_quoted(),
            b'0'..=b'9' => self.scan_integer(),
            _ if is_name_start(b) => self.scan_name(),
            _ => {
                let ch = self.text[self.pos..].chars().next().unwrap_or('\u{FFFD}');
                self.pos += ch.len_utf8();
                let text = ch.to_string();
                self.error(self.token_start, &messages::INVALID_CHARACTER, &[&text]);
                SyntaxKind::Unknown
            }
        };
        self.token
    }

    #[inline]
    fn single(&mut self, kind: SyntaxKind) -> SyntaxKind {
        self.pos += 1;
        kind
    }

    #[inline]
    fn double(&mut self, kind: SyntaxKind) -> SyntaxKind {
        self.pos += 2;
        kind
    }

    // ========================================================================
    // Token-specific scanning methods
    // ========================================================================

    /// Consume `word(::word)*` starting at the current position.
    fn consume_qualified_word(&mut self) {
        loop {
            while self.byte_at(0).is_some_and(is_word_byte) {
                self.pos += 1;
            }
            if self.byte_at(0) == Some(b':')
                && self.byte_at(1) == Some(b':')
                && self.byte_at(2).is_some_and(is_word_byte)
            {
                self.pos += 2;
            } else {
                return;
            }
        }
    }

    fn scan_name(&mut self) -> SyntaxKind {
        if self.byte_at(0) == Some(b':') {
            self.pos += 2;
        }
        self.consume_qualified_word();
        let text = &self.text[self.token_start..self.pos];
        self.token_value.push_str(text);
        SyntaxKind::from_keyword(text).unwrap_or(SyntaxKind::Name)
    }

    fn scan_variable(&mut self) -> SyntaxKind {
        self.pos += 1;
        let name_start = self.pos;
        if self.byte_at(0) == Some(b':') && self.byte_at(1) == Some(b':') {
            self.pos += 2;
        }
        if !self.byte_at(0).is_some_and(is_word_byte) {
            self.error(self.token_start, &messages::VARIABLE_NAME_EXPECTED, &[]);
            return SyntaxKind::Unknown;
        }
        self.consume_qualified_word();
        self.token_value.push_str(&self.text[name_start..self.pos]);
        SyntaxKind::Variable
    }

    fn scan_integer(&mut self) -> SyntaxKind {
        if self.byte_at(0) == Some(b'-') {
            self.pos += 1;
        }
        while self.byte_at(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.token_value.push_str(&self.text[self.token_start..self.pos]);
        SyntaxKind::IntegerLiteral
    }

    /// `'...'`: only `\'` and `\\` are escapes.
    fn scan_single_quoted(&mut self) -> SyntaxKind {
        self.pos += 1;
        loop {
            let rest = &self.bytes[self.pos..];
            match memchr2(b'\'', b'\\', rest) {
                None => {
                    self.token_value.push_str(&self.text[self.pos..]);
                    self.pos = self.bytes.len();
                    self.error(self.token_start, &messages::UNTERMINATED_STRING_LITERAL, &[]);
                    break;
                }
                Some(offset) => {
                    let at = self.pos + offset;
                    self.token_value.push_str(&self.text[self.pos..at]);
                    if self.bytes[at] == b'\'' {
                        self.pos = at + 1;
                        break;
                    }
                    match self.bytes.get(at + 1) {
                        Some(&escaped @ (b'\'' | b'\\')) => {
                            self.token_value.push(escaped as char);
                            self.pos = at + 2;
                        }
                        _ => {
                            self.token_value.push('\\');
                            self.pos = at + 1;
                        }
                    }
                }
            }
        }
        SyntaxKind::SingleQuotedString
    }

    /// `"..."`: the raw content is kept; escapes are resolved by the parser
    /// together with interpolation.
    fn scan_double_quoted(&mut self) -> SyntaxKind {
        self.pos += 1;
        let content_start = self.pos;
        loop {
            match memchr2(b'"', b'\\', &self.bytes[self.pos..]) {
                None => {
                    self.pos = self.bytes.len();
                    self.token_value.push_str(&self.text[content_start..]);
                    self.error(self.token_start, &messages::UNTERMINATED_STRING_LITERAL, &[]);
                    return SyntaxKind::DoubleQuotedString;
                }
                Some(offset) => {
                    let at = self.pos + offset;
                    if self.bytes[at] == b'"' {
                        self.token_value.push_str(&self.text[content_start..at]);
                        self.pos = at + 1;
                        return SyntaxKind::DoubleQuotedString;
                    }
                    self.pos = (at + 2).min(self.bytes.len());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SyntaxKind> {
        let mut scanner = Scanner::new(text);
        let mut out = Vec::new();
        loop {
            let kind = scanner.scan();
            if kind == SyntaxKind::EndOfFileToken {
                return out;
            }
            out.push(kind);
        }
    }

    #[test]
    fn test_assignment_tokens() {
        assert_eq!(
            kinds("$x = 'a'"),
            vec![SyntaxKind::Variable, SyntaxKind::EqualsToken, SyntaxKind::SingleQuotedString]
        );
        assert_eq!(
            kinds("$x += 1 $y -= -2"),
            vec![
                SyntaxKind::Variable,
                SyntaxKind::PlusEqualsToken,
                SyntaxKind::IntegerLiteral,
                SyntaxKind::Variable,
                SyntaxKind::MinusEqualsToken,
                SyntaxKind::IntegerLiteral,
            ]
        );
    }

    #[test]
    fn test_qualified_variable_value() {
        let mut scanner = Scanner::new("$::foo::bar $::top");
        assert_eq!(scanner.scan(), SyntaxKind::Variable);
        assert_eq!(scanner.token_value(), "::foo::bar");
        assert_eq!(scanner.scan(), SyntaxKind::Variable);
        assert_eq!(scanner.token_value(), "::top");
    }

    #[test]
    fn test_names_and_keywords() {
        let mut scanner = Scanner::new("class foo::bar inherits ::baz");
        assert_eq!(scanner.scan(), SyntaxKind::ClassKeyword);
        assert_eq!(scanner.scan(), SyntaxKind::Name);
        assert_eq!(scanner.token_value(), "foo::bar");
        assert_eq!(scanner.scan(), SyntaxKind::InheritsKeyword);
        assert_eq!(scanner.scan(), SyntaxKind::Name);
        assert_eq!(scanner.token_value(), "::baz");
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("# leading\n$a = 1 /* block\n comment */ ; # trailing"),
            vec![
                SyntaxKind::Variable,
                SyntaxKind::EqualsToken,
                SyntaxKind::IntegerLiteral,
                SyntaxKind::SemicolonToken,
            ]
        );
    }

    #[test]
    fn test_single_quoted_escapes() {
        let mut scanner = Scanner::new(r"'it\'s a \\ and \n'");
        assert_eq!(scanner.scan(), SyntaxKind::SingleQuotedString);
        assert_eq!(scanner.token_value(), r"it's a \ and \n");
    }

    #[test]
    fn test_double_quoted_keeps_raw_content() {
        let mut scanner = Scanner::new(r#""a \"b\" ${c}" x"#);
        assert_eq!(scanner.scan(), SyntaxKind::DoubleQuotedString);
        assert_eq!(scanner.token_value(), r#"a \"b\" ${c}"#);
        assert_eq!(scanner.scan(), SyntaxKind::Name);
    }

    #[test]
    fn test_unterminated_string_reports() {
        let mut scanner = Scanner::new("'open");
        assert_eq!(scanner.scan(), SyntaxKind::SingleQuotedString);
        assert_eq!(scanner.token_value(), "open");
        assert!(scanner.diagnostics().has_errors());
    }

    #[test]
    fn test_token_spans_are_byte_offsets() {
        let mut scanner = Scanner::new("  $var = 'x'");
        scanner.scan();
        assert_eq!(scanner.token_span(), TextSpan::from_bounds(2, 6));
        scanner.scan();
        assert_eq!(scanner.token_start(), 7);
    }

    #[test]
    fn test_invalid_character() {
        let mut scanner = Scanner::new("é");
        assert_eq!(scanner.scan(), SyntaxKind::Unknown);
        assert_eq!(scanner.token_end(), 2);
        let diagnostic = &scanner.diagnostics().diagnostics()[0];
        assert_eq!(diagnostic.code, 1006);
    }

    #[test]
    fn test_look_ahead_restores() {
        let mut scanner = Scanner::new("foo { 'x': }");
        scanner.scan();
        let next = scanner.look_ahead(|s| s.scan());
        assert_eq!(next, SyntaxKind::OpenBraceToken);
        assert_eq!(scanner.token(), SyntaxKind::Name);
        assert_eq!(scanner.token_value(), "foo");
    }
}
