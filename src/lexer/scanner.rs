use crate::{ast::Literal, errors, TlpsError};

use super::{Token, TokenType};

#[derive(Debug)]
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    finished: bool,
}

#[allow(clippy::while_let_on_iterator)]
impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            finished: false,
        }
    }

    fn match_char(&mut self, next: char) -> bool {
        if let Some((_, c)) = self.chars.peek() {
            if *c == next {
                self.chars.next();
                return true;
            }
        }

        false
    }

    /// Consumes characters while `f` holds and returns the byte offset just past the last one.
    fn advance_while_fn<F: Fn(char) -> bool>(&mut self, start: usize, f: F) -> usize {
        let mut end = start;
        while let Some((loc, c)) = self.chars.peek() {
            if !f(*c) {
                break;
            }

            if *c == '\n' {
                self.line += 1;
            }

            end = *loc + c.len_utf8();
            self.chars.next();
        }

        end
    }

    fn simple(&self, ty: TokenType, lexeme: &str) -> Option<Result<Token, TlpsError>> {
        Some(Ok(Token::new(ty, lexeme, None, self.line)))
    }

    fn read_token(&mut self) -> Option<Result<Token, TlpsError>> {
        while let Some((loc, char)) = self.chars.next() {
            match char {
                ' ' | '\r' | '\t' => continue,
                '\n' => self.line += 1,
                '(' => return self.simple(TokenType::LeftParen, "("),
                ')' => return self.simple(TokenType::RightParen, ")"),
                '{' => return self.simple(TokenType::LeftBrace, "{"),
                '}' => return self.simple(TokenType::RightBrace, "}"),
                ',' => return self.simple(TokenType::Comma, ","),
                '.' => return self.simple(TokenType::Dot, "."),
                '-' => return self.simple(TokenType::Minus, "-"),
                '+' => return self.simple(TokenType::Plus, "+"),
                ';' => return self.simple(TokenType::Semicolon, ";"),
                '*' => return self.simple(TokenType::Star, "*"),

                '!' if self.match_char('=') => return self.simple(TokenType::BangEqual, "!="),
                '!' => return self.simple(TokenType::Bang, "!"),
                '=' if self.match_char('=') => return self.simple(TokenType::EqualEqual, "=="),
                '=' => return self.simple(TokenType::Equal, "="),
                '>' if self.match_char('=') => return self.simple(TokenType::GreaterEqual, ">="),
                '>' => return self.simple(TokenType::Greater, ">"),
                '<' if self.match_char('=') => return self.simple(TokenType::LessEqual, "<="),
                '<' => return self.simple(TokenType::Less, "<"),

                '/' if self.match_char('/') => {
                    while let Some((_, c)) = self.chars.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '/' if self.match_char('*') => self.skip_block_comment(),
                '/' => return self.simple(TokenType::Slash, "/"),

                '"' => return Some(self.read_string(loc)),

                c if c.is_ascii_digit() => return Some(Ok(self.read_number(loc))),
                c if c.is_alphabetic() || c == '_' => return Some(Ok(self.read_identifier(loc))),

                _ => return Some(Err(errors::lexical(self.line, "Unexpected character."))),
            }
        }

        None
    }

    fn skip_block_comment(&mut self) {
        let mut depth = 1;
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\n' => self.line += 1,
                '/' if self.match_char('*') => depth += 1,
                '*' if self.match_char('/') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
    }

    fn read_string(&mut self, start: usize) -> Result<Token, TlpsError> {
        let line = self.line;

        while let Some((loc, c)) = self.chars.next() {
            match c {
                '\n' => self.line += 1,
                '"' => {
                    let value = self.source[start + 1..loc].to_string();
                    return Ok(Token::new(
                        TokenType::String,
                        &self.source[start..=loc],
                        Some(Literal::String(value)),
                        line,
                    ));
                }
                _ => {}
            }
        }

        Err(errors::lexical(self.line, "Unterminated string."))
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut end = self.advance_while_fn(start + 1, |c| c.is_ascii_digit());

        if let Some((loc, '.')) = self.chars.peek().copied() {
            let fraction_follows = self.source[loc + 1..]
                .chars()
                .next()
                .map(|c| c.is_ascii_digit())
                .unwrap_or_default();

            if fraction_follows {
                self.chars.next();
                end = self.advance_while_fn(loc + 1, |c| c.is_ascii_digit());
            }
        }

        let lexeme = &self.source[start..end];
        // A run of ASCII digits with an optional fraction always parses.
        let value = lexeme.parse().unwrap_or_default();
        Token::new(TokenType::Number, lexeme, Some(Literal::Number(value)), self.line)
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        let first = self.source[start..].chars().next().map(char::len_utf8).unwrap_or(1);
        let end = self.advance_while_fn(start + first, |c| c.is_alphanumeric() || c == '_');
        let lexeme = &self.source[start..end];

        let ty = TokenType::keyword(lexeme).unwrap_or(TokenType::Identifier);
        let literal = match ty {
            TokenType::True => Some(Literal::Bool(true)),
            TokenType::False => Some(Literal::Bool(false)),
            TokenType::Nil => Some(Literal::Nil),
            _ => None,
        };

        Token::new(ty, lexeme, literal, self.line)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, TlpsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_token() {
            Some(token) => Some(token),
            None => {
                self.finished = true;
                Some(Ok(Token::new(TokenType::Eof, "", None, self.line)))
            }
        }
    }
}
