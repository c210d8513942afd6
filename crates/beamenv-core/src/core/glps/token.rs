use std::fmt;

/// 1-based location of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    Colon,
    Semicolon,
    Equals,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Star,
    Plus,
    Minus,
    Slash,
    Eof,
}

impl TokenKind {
    /// Short human readable form used in syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Number(v) => format!("number {}", v),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            punct => format!("'{}'", punct.punctuation().unwrap_or('?')),
        }
    }

    fn punctuation(&self) -> Option<char> {
        let c = match self {
            TokenKind::Colon => ':',
            TokenKind::Semicolon => ';',
            TokenKind::Equals => '=',
            TokenKind::Comma => ',',
            TokenKind::LParen => '(',
            TokenKind::RParen => ')',
            TokenKind::LBracket => '[',
            TokenKind::RBracket => ']',
            TokenKind::Star => '*',
            TokenKind::Plus => '+',
            TokenKind::Minus => '-',
            TokenKind::Slash => '/',
            _ => return None,
        };
        Some(c)
    }

    pub(crate) fn from_punctuation(byte: u8) -> Option<Self> {
        let kind = match byte {
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            b'=' => TokenKind::Equals,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'*' => TokenKind::Star,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'/' => TokenKind::Slash,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    pub fn is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.kind) == std::mem::discriminant(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_names_the_offending_token() {
        assert_eq!(TokenKind::Ident("x1".into()).describe(), "identifier 'x1'");
        assert_eq!(TokenKind::Semicolon.describe(), "';'");
        assert_eq!(TokenKind::Eof.describe(), "end of input");
    }

    #[test]
    fn is_compares_kinds_without_payload() {
        let token = Token::new(TokenKind::Ident("a".into()), Position::new(1, 1));
        assert!(token.is(&TokenKind::Ident(String::new())));
        assert!(!token.is(&TokenKind::Colon));
    }
}
