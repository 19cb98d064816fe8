//! Expression lexer — tokenizes expression source text.
//!
//! Only what reference extraction needs is distinguished; every other
//! operator character becomes a single `Operator` token.

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Source span (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    StringLiteral,

    LParen, RParen, LBracket, RBracket, LBrace, RBrace,
    Dot, Comma, Semicolon,
    Operator,

    Eof,
}

/// Tokenize expression text.
///
/// Comments are skipped. Unterminated strings and block comments are
/// syntax errors.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => { chars.next(); }

            // Skip block comments /* ... */
            '/' if matches!(chars.clone().nth(1), Some((_, '*'))) => {
                chars.next();
                chars.next();
                let mut prev = '\0';
                loop {
                    match chars.next() {
                        Some((_, '/')) if prev == '*' => break,
                        Some((_, c)) => prev = c,
                        None => {
                            return Err(Error::SyntaxError {
                                position: pos,
                                message: "Unterminated block comment".into(),
                            });
                        }
                    }
                }
            }

            // Skip line comments
            '/' if matches!(chars.clone().nth(1), Some((_, '/'))) => {
                while chars.peek().is_some_and(|&(_, c)| c != '\n') {
                    chars.next();
                }
            }

            '\'' | '"' | '`' => {
                let quote = ch;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => {
                            if let Some((_, escaped)) = chars.next() {
                                match escaped {
                                    'n' => s.push('\n'),
                                    't' => s.push('\t'),
                                    c => s.push(c),
                                }
                            }
                        }
                        Some((end, c)) if c == quote => {
                            tokens.push(Token {
                                kind: TokenKind::StringLiteral,
                                span: Span { start: pos, end: end + 1 },
                                text: s,
                            });
                            break;
                        }
                        Some((_, c)) => s.push(c),
                        None => return Err(Error::SyntaxError {
                            position: pos,
                            message: "Unterminated string literal".into(),
                        }),
                    }
                }
            }

            c if c.is_ascii_digit() => {
                let mut num = String::new();
                let mut seen_dot = false;
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        num.push(c);
                    } else if c == '.' && !seen_dot {
                        seen_dot = true;
                        num.push(c);
                    } else {
                        break;
                    }
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Number,
                    span: Span { start: pos, end: pos + num.len() },
                    text: num,
                });
            }

            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '$' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Identifier,
                    span: Span { start: pos, end: pos + ident.len() },
                    text: ident,
                });
            }

            '(' => { chars.next(); tokens.push(punct(TokenKind::LParen, pos, "(")); }
            ')' => { chars.next(); tokens.push(punct(TokenKind::RParen, pos, ")")); }
            '[' => { chars.next(); tokens.push(punct(TokenKind::LBracket, pos, "[")); }
            ']' => { chars.next(); tokens.push(punct(TokenKind::RBracket, pos, "]")); }
            '{' => { chars.next(); tokens.push(punct(TokenKind::LBrace, pos, "{")); }
            '}' => { chars.next(); tokens.push(punct(TokenKind::RBrace, pos, "}")); }
            '.' => { chars.next(); tokens.push(punct(TokenKind::Dot, pos, ".")); }
            ',' => { chars.next(); tokens.push(punct(TokenKind::Comma, pos, ",")); }
            ';' => { chars.next(); tokens.push(punct(TokenKind::Semicolon, pos, ";")); }

            other => {
                chars.next();
                let mut buf = [0u8; 4];
                tokens.push(punct(TokenKind::Operator, pos, other.encode_utf8(&mut buf)));
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });

    Ok(tokens)
}

fn punct(kind: TokenKind, pos: usize, text: &str) -> Token {
    Token {
        kind,
        span: Span { start: pos, end: pos + text.len() },
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_reference() {
        let tokens = tokenize("thisComp.layer(\"Control\")").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![
            TokenKind::Identifier, // thisComp
            TokenKind::Dot,
            TokenKind::Identifier, // layer
            TokenKind::LParen,
            TokenKind::StringLiteral,
            TokenKind::RParen,
            TokenKind::Eof,
        ]);
        assert_eq!(tokens[4].text, "Control");
        assert_eq!(tokens[4].span, Span { start: 15, end: 24 });
    }

    #[test]
    fn test_operators_and_numbers() {
        let tokens = tokenize("value * 2.5 + wiggle(3, 10)[0]").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Operator);
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].text, "2.5");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::LBracket));
    }

    #[test]
    fn test_comments_skipped() {
        let tokens = tokenize("// line\nx /* block\n */ + 1").unwrap();
        assert_eq!(tokens[0].text, "x");
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_escaped_quote() {
        let tokens = tokenize(r#"layer("Say \"hi\"")"#).unwrap();
        assert_eq!(tokens[2].text, "Say \"hi\"");
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("thisComp.layer(\"Oops").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { position: 15, .. }));
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(tokenize("x /* never closed").is_err());
    }
}
