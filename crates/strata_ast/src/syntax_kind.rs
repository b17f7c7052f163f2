//! SyntaxKind enum - token kinds produced by the scanner.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SyntaxKind {
    // ========================================================================
    // Tokens
    // ========================================================================
    Unknown,
    EndOfFileToken,

    // Literals
    /// `'...'`; the token value is the unescaped content.
    SingleQuotedString,
    /// `"..."`; the token value is the raw content, interpolation and
    /// escapes are handled by the parser.
    DoubleQuotedString,
    IntegerLiteral,
    /// `$name`, `$::name`, `$a::b`; the token value excludes the `$`.
    Variable,
    /// A bare name, optionally qualified: `foo`, `foo::bar`, `::foo`.
    Name,

    // Punctuation
    OpenBraceToken,
    CloseBraceToken,
    OpenParenToken,
    CloseParenToken,
    OpenBracketToken,
    CloseBracketToken,
    CommaToken,
    ColonToken,
    SemicolonToken,
    EqualsToken,
    PlusEqualsToken,
    MinusEqualsToken,
    EqualsGreaterThanToken,

    // Keywords
    ClassKeyword,
    DefineKeyword,
    NodeKeyword,
    InheritsKeyword,
    IncludeKeyword,
    DefaultKeyword,
    TrueKeyword,
    FalseKeyword,
    UndefKeyword,
}

impl SyntaxKind {
    /// Map an unqualified name to its keyword kind, if it is one.
    pub fn from_keyword(text: &str) -> Option<SyntaxKind> {
        let kind = match text {
            "class" => SyntaxKind::ClassKeyword,
            "define" => SyntaxKind::DefineKeyword,
            "node" => SyntaxKind::NodeKeyword,
            "inherits" => SyntaxKind::InheritsKeyword,
            "include" => SyntaxKind::IncludeKeyword,
            "default" => SyntaxKind::DefaultKeyword,
            "true" => SyntaxKind::TrueKeyword,
            "false" => SyntaxKind::FalseKeyword,
            "undef" => SyntaxKind::UndefKeyword,
            _ => return None,
        };
        Some(kind)
    }

    pub fn keyword_text(self) -> Option<&'static str> {
        match self {
            SyntaxKind::ClassKeyword => Some("class"),
            SyntaxKind::DefineKeyword => Some("define"),
            SyntaxKind::NodeKeyword => Some("node"),
            SyntaxKind::InheritsKeyword => Some("inherits"),
            SyntaxKind::IncludeKeyword => Some("include"),
            SyntaxKind::DefaultKeyword => Some("default"),
            SyntaxKind::TrueKeyword => Some("true"),
            SyntaxKind::FalseKeyword => Some("false"),
            SyntaxKind::UndefKeyword => Some("undef"),
            _ => None,
        }
    }

    pub fn punctuation_text(self) -> Option<&'static str> {
        match self {
            SyntaxKind::OpenBraceToken => Some("{"),
            SyntaxKind::CloseBraceToken => Some("}"),
            SyntaxKind::OpenParenToken => Some("("),
            SyntaxKind::CloseParenToken => Some(")"),
            SyntaxKind::OpenBracketToken => Some("["),
            SyntaxKind::CloseBracketToken => Some("]"),
            SyntaxKind::CommaToken => Some(","),
            SyntaxKind::ColonToken => Some(":"),
            SyntaxKind::SemicolonToken => Some(";"),
            SyntaxKind::EqualsToken => Some("="),
            SyntaxKind::PlusEqualsToken => Some("+="),
            SyntaxKind::MinusEqualsToken => Some("-="),
            SyntaxKind::EqualsGreaterThanToken => Some("=>"),
            _ => None,
        }
    }

    pub fn is_keyword(self) -> bool {
        self.keyword_text().is_some()
    }

    /// Display text for diagnostics.
    pub fn text(self) -> &'static str {
        self.punctuation_text()
            .or_else(|| self.keyword_text())
            .unwrap_or(match self {
                SyntaxKind::EndOfFileToken => "end of file",
                SyntaxKind::SingleQuotedString | SyntaxKind::DoubleQuotedString => "string",
                SyntaxKind::IntegerLiteral => "integer",
                SyntaxKind::Variable => "variable",
                SyntaxKind::Name => "name",
                _ => "token",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        for word in ["class", "define", "node", "inherits", "include", "default", "true", "false", "undef"] {
            let kind = SyntaxKind::from_keyword(word).unwrap();
            assert_eq!(kind.keyword_text(), Some(word));
        }
        assert_eq!(SyntaxKind::from_keyword("notify"), None);
    }
}
