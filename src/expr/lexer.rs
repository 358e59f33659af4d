/// Bound-expression lexer - converts `L <= core <= U` text into tokens

use crate::error::{RepairError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Le,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset in the source
    pub pos: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let pos = self.position;

        if self.is_eof() {
            return Ok(Token { kind: TokenKind::Eof, pos });
        }

        let kind = match self.current_char() {
            '0'..='9' | '.' => self.read_number()?,
            'a'..='z' | 'A'..='Z' | '_' => self.read_identifier(),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '<' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenKind::Le
                } else {
                    return Err(RepairError::Parse(format!(
                        "Expected '<=' at offset {}", pos
                    )));
                }
            }
            ch => {
                return Err(RepairError::Parse(format!(
                    "Unexpected character '{}' at offset {}", ch, pos
                )))
            }
        };

        Ok(Token { kind, pos })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn current_char(&self) -> char {
        if self.is_eof() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn read_number(&mut self) -> Result<TokenKind> {
        let mut value = String::new();

        while !self.is_eof() && (self.current_char().is_ascii_digit() || self.current_char() == '.') {
            value.push(self.current_char());
            self.advance();
        }

        // Scientific notation (e.g., 1.5e-3)
        if !self.is_eof() && (self.current_char() == 'e' || self.current_char() == 'E') {
            value.push(self.current_char());
            self.advance();
            if !self.is_eof() && (self.current_char() == '+' || self.current_char() == '-') {
                value.push(self.current_char());
                self.advance();
            }
            while !self.is_eof() && self.current_char().is_ascii_digit() {
                value.push(self.current_char());
                self.advance();
            }
        }

        value
            .parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| RepairError::Parse(format!("Invalid number: {}", value)))
    }

    fn read_identifier(&mut self) -> TokenKind {
        let mut value = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::Identifier(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        Lexer::new(text).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lexer_bound() {
        let tokens = kinds("0.4 <= agg1 / agg2 <= 0.6");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Number(0.4),
                TokenKind::Le,
                TokenKind::Identifier("agg1".into()),
                TokenKind::Slash,
                TokenKind::Identifier("agg2".into()),
                TokenKind::Le,
                TokenKind::Number(0.6),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_operators() {
        let tokens = kinds("(a+b)*c-1e2");
        assert_eq!(tokens[0], TokenKind::LParen);
        assert_eq!(tokens[2], TokenKind::Plus);
        assert_eq!(tokens[5], TokenKind::Star);
        assert_eq!(tokens[7], TokenKind::Minus);
        assert_eq!(tokens[8], TokenKind::Number(100.0));
    }

    #[test]
    fn test_lexer_errors() {
        assert!(Lexer::new("a < b").tokenize().is_err());
        assert!(Lexer::new("a % b").tokenize().is_err());
        assert!(Lexer::new("1.2.3").tokenize().is_err());
    }
}
