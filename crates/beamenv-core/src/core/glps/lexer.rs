use super::error::GlpsError;
use super::token::{Position, Token, TokenKind};

/// Pull-based tokenizer over raw GLPS bytes.
///
/// Tokens are produced on demand so that the parser reports problems in the
/// order they appear in the file.
pub struct Lexer<'a> {
    src: &'a [u8],
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, GlpsError> {
        self.skip_trivia();
        let pos = self.position();

        let Some(byte) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, pos));
        };

        if byte.is_ascii_alphabetic() || byte == b'_' {
            return Ok(Token::new(self.lex_ident(), pos));
        }
        if byte.is_ascii_digit() || (byte == b'.' && self.peek_at(1).is_some_and(|b| b.is_ascii_digit())) {
            return self.lex_number(pos);
        }
        if byte == b'"' {
            return self.lex_string(pos);
        }
        if let Some(kind) = TokenKind::from_punctuation(byte) {
            self.bump();
            return Ok(Token::new(kind, pos));
        }

        Err(GlpsError::InvalidCharacter { pos, byte })
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.offset).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.offset + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.offset += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => {
                    self.bump();
                }
                b'#' => {
                    while let Some(b) = self.bump() {
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_ident(&mut self) -> TokenKind {
        let start = self.offset;
        let mut end = start;
        let mut scan = start;
        while let Some(&b) = self.src.get(scan) {
            if b.is_ascii_alphanumeric() || b == b'_' {
                scan += 1;
                end = scan;
            } else if b == b':' {
                scan += 1;
            } else {
                break;
            }
        }
        // Identifiers never end with ':' so that `name:` still splits.
        while self.offset < end {
            self.bump();
        }
        TokenKind::Ident(String::from_utf8_lossy(&self.src[start..end]).into_owned())
    }

    fn lex_number(&mut self, pos: Position) -> Result<Token, GlpsError> {
        let start = self.offset;
        self.eat_digits();
        if self.peek() == Some(b'.') {
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let digits_at = match self.peek_at(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if self.peek_at(digits_at).is_some_and(|b| b.is_ascii_digit()) {
                for _ in 0..digits_at {
                    self.bump();
                }
                self.eat_digits();
            }
        }

        let text = String::from_utf8_lossy(&self.src[start..self.offset]);
        let value: f64 = text.parse().map_err(|_| GlpsError::Syntax {
            pos,
            expected: "a numeric literal",
            found: format!("'{}'", text),
        })?;
        if !value.is_finite() {
            return Err(GlpsError::calc_error(
                pos,
                format!("numeric literal {} results in non-finite value", text),
            ));
        }
        Ok(Token::new(TokenKind::Number(value), pos))
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.bump();
        }
    }

    fn lex_string(&mut self, pos: Position) -> Result<Token, GlpsError> {
        self.bump();
        let start = self.offset;
        loop {
            let byte_pos = self.position();
            match self.bump() {
                None => return Err(GlpsError::UnterminatedQuote { pos }),
                Some(b'"') => break,
                Some(0) => {
                    return Err(GlpsError::InvalidCharacter {
                        pos: byte_pos,
                        byte: 0,
                    });
                }
                Some(_) => {}
            }
        }
        let bytes = &self.src[start..self.offset - 1];
        Ok(Token::new(TokenKind::Str(decode_string(bytes)), pos))
    }
}

/// UTF-8 when valid, otherwise each byte maps to the code point of the same value.
fn decode_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
