use super::error::GlpsError;
use super::eval::{self, BinaryOp};
use super::expand::LineBuilder;
use super::lexer::Lexer;
use super::symbols::{Symbol, SymbolTable};
use super::token::{Position, Token, TokenKind};
use crate::core::config::{Config, ElementConfig, Value};

/// Deepest allowed nesting of unary minus, parentheses, calls and vectors.
const MAX_NESTING: usize = 256;

/// Recursive-descent GLPS parser.
///
/// Expressions are evaluated and names resolved while parsing, so a failure is
/// reported at the first offending token and nothing after it is examined.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
    symbols: SymbolTable,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a [u8]) -> Result<Self, GlpsError> {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            peeked: None,
            symbols: SymbolTable::new(),
            depth: 0,
        })
    }

    pub fn parse(mut self) -> Result<Config, GlpsError> {
        while self.current.kind != TokenKind::Eof {
            self.statement()?;
        }
        self.symbols.into_config()
    }

    fn advance(&mut self) -> Result<Token, GlpsError> {
        let next = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn peek(&mut self) -> Result<&TokenKind, GlpsError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(&self.peeked.insert(token).kind)
    }

    fn unexpected(&self, expected: &'static str) -> GlpsError {
        GlpsError::Syntax {
            pos: self.current.pos,
            expected,
            found: self.current.kind.describe(),
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, GlpsError> {
        if self.current.is(&kind) {
            self.advance()
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<(String, Position), GlpsError> {
        if let TokenKind::Ident(_) = self.current.kind {
            let token = self.advance()?;
            if let TokenKind::Ident(name) = token.kind {
                return Ok((name, token.pos));
            }
        }
        Err(self.unexpected(expected))
    }

    fn statement(&mut self) -> Result<(), GlpsError> {
        let (name, pos) = self.expect_ident("an identifier to start a statement")?;
        match self.current.kind {
            TokenKind::Equals => {
                self.advance()?;
                let value = self.expr()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                self.symbols.define(name, Symbol::Value(value), pos)
            }
            TokenKind::Colon => {
                self.advance()?;
                let (type_name, _) = self.expect_ident("an element type or 'line'")?;
                if type_name.eq_ignore_ascii_case("line") && self.current.kind == TokenKind::Equals {
                    self.line_definition(name, pos)
                } else {
                    self.element_definition(name, type_name, pos)
                }
            }
            _ => Err(self.unexpected("'=' or ':'")),
        }
    }

    fn element_definition(
        &mut self,
        name: String,
        type_name: String,
        pos: Position,
    ) -> Result<(), GlpsError> {
        let mut element = ElementConfig::new(name.clone(), type_name);
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            let (param, param_pos) = self.expect_ident("a parameter name")?;
            self.expect(TokenKind::Equals, "'='")?;
            let value = self.expr()?;
            if element.params.insert(param.clone(), value).is_some() {
                return Err(GlpsError::Redefinition {
                    pos: param_pos,
                    name: param,
                });
            }
        }
        self.expect(TokenKind::Semicolon, "',' or ';'")?;
        self.symbols.define(name, Symbol::Element(element), pos)
    }

    fn line_definition(&mut self, name: String, pos: Position) -> Result<(), GlpsError> {
        self.expect(TokenKind::Equals, "'='")?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut builder = LineBuilder::new();
        loop {
            self.line_item(&mut builder)?;
            match self.current.kind {
                TokenKind::Comma => {
                    self.advance()?;
                }
                TokenKind::RParen => {
                    self.advance()?;
                    break;
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        self.symbols.define(name, Symbol::Line(builder.finish()), pos)
    }

    fn line_item(&mut self, builder: &mut LineBuilder) -> Result<(), GlpsError> {
        if let TokenKind::Ident(_) = self.current.kind {
            if !matches!(self.peek()?, TokenKind::Star | TokenKind::LParen) {
                let (target, pos) = self.expect_ident("an element or line name")?;
                return builder.push(&self.symbols, &target, 1, pos);
            }
        }

        let factor_pos = self.current.pos;
        let factor = self.unary()?;
        self.expect(TokenKind::Star, "'*'")?;
        let (target, pos) = self.expect_ident("an element or line name")?;
        let count = LineBuilder::repeat_count(&factor, factor_pos)?;
        builder.push(&self.symbols, &target, count, pos)
    }

    fn expr(&mut self) -> Result<Value, GlpsError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            let pos = self.advance()?.pos;
            let rhs = self.term()?;
            lhs = eval::binary(op, lhs, rhs, pos)?;
        }
    }

    fn term(&mut self) -> Result<Value, GlpsError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            let pos = self.advance()?.pos;
            let rhs = self.unary()?;
            lhs = eval::binary(op, lhs, rhs, pos)?;
        }
    }

    /// Every nested sub-expression passes through here, so this is where
    /// nesting depth is bounded.
    fn unary(&mut self) -> Result<Value, GlpsError> {
        if self.depth >= MAX_NESTING {
            return Err(self.unexpected("a less deeply nested expression"));
        }
        self.depth += 1;
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> Result<Value, GlpsError> {
        if self.current.kind == TokenKind::Minus {
            let pos = self.advance()?.pos;
            let operand = self.unary()?;
            return eval::negate(operand, pos);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Value, GlpsError> {
        match &self.current.kind {
            TokenKind::Number(v) => {
                let v = *v;
                self.advance()?;
                Ok(Value::Scalar(v))
            }
            TokenKind::Str(_) => {
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Str(s) => Ok(Value::String(s)),
                    _ => Err(GlpsError::Syntax {
                        pos: token.pos,
                        expected: "a string literal",
                        found: token.kind.describe(),
                    }),
                }
            }
            TokenKind::Ident(_) => {
                let is_call = matches!(self.peek()?, TokenKind::LParen);
                let (name, pos) = self.expect_ident("an identifier")?;
                if is_call && eval::is_builtin(&name) {
                    self.advance()?;
                    let arg = self.expr()?;
                    self.expect(TokenKind::RParen, "')'")?;
                    eval::call(&name, arg, pos)
                } else {
                    self.symbols.value(&name, pos).cloned()
                }
            }
            TokenKind::LParen => {
                self.advance()?;
                let value = self.expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(value)
            }
            TokenKind::LBracket => self.vector(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn vector(&mut self) -> Result<Value, GlpsError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();
        if self.current.kind == TokenKind::RBracket {
            self.advance()?;
            return Ok(Value::Vector(items));
        }
        loop {
            let pos = self.current.pos;
            let value = self.expr()?;
            items.push(eval::vector_element(value, pos)?);
            match self.current.kind {
                TokenKind::Comma => {
                    self.advance()?;
                }
                TokenKind::RBracket => {
                    self.advance()?;
                    return Ok(Value::Vector(items));
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }
}
