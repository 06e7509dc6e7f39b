//! Single-pass tokenizer (spec §4.F): source bytes to a flat token vector,
//! line/column tracked as we go. Strings are kept raw; escape processing
//! happens later during AST construction so a `SyntaxError` inside a string
//! literal can re-lex the original bytes for its caret span.

use ember_core::error::Error;
use ember_core::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Newline,
    Eof,
    Int(String),
    Float(String),
    /// Raw contents between the quotes, escapes untouched.
    Str(String),
    Ident(String),

    Comma,
    Colon,
    Dot,
    Semicolon,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    Eq,
    Tilde,
    AmpAmp,
    PipePipe,

    KwIf,
    KwElif,
    KwElse,
    KwThen,
    KwTry,
    KwCatch,
    KwWhile,
    KwDo,
    KwFunc,
    KwRet,
    KwType,
    KwTrue,
    KwFalse,
    KwNone,
    KwFor,
    KwIn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "if" => TokenKind::KwIf,
        "elif" => TokenKind::KwElif,
        "else" => TokenKind::KwElse,
        "then" => TokenKind::KwThen,
        "try" => TokenKind::KwTry,
        "catch" => TokenKind::KwCatch,
        "while" => TokenKind::KwWhile,
        "do" => TokenKind::KwDo,
        "func" => TokenKind::KwFunc,
        "ret" => TokenKind::KwRet,
        "type" => TokenKind::KwType,
        "true" => TokenKind::KwTrue,
        "false" => TokenKind::KwFalse,
        "none" => TokenKind::KwNone,
        "for" => TokenKind::KwFor,
        "in" => TokenKind::KwIn,
        _ => return None,
    })
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token()?;
            let at_eof = matches!(tok.kind, TokenKind::Eof);
            out.push(tok);
            if at_eof {
                break;
            }
        }
        Ok(out)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn mark(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.col)
    }

    fn span_from(&self, start: (usize, u32, u32)) -> Span {
        Span::new(
            start.0 as u32,
            (self.pos - start.0) as u32,
            start.1,
            start.2,
        )
    }

    fn next_token(&mut self) -> Result<Token, Error> {
        loop {
            match self.peek() {
                None => {
                    let start = self.mark();
                    return Ok(Token {
                        kind: TokenKind::Eof,
                        span: self.span_from(start),
                    });
                }
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.advance();
                    continue;
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                    continue;
                }
                _ => break,
            }
        }

        let start = self.mark();
        let c = self.advance().unwrap();

        let kind = match c {
            b'\n' => TokenKind::Newline,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.advance();
                    TokenKind::StarStar
                } else {
                    TokenKind::Star
                }
            }
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'~' => TokenKind::Tilde,
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    return Err(Error::syntax("unexpected character '!'")
                        .with_span(self.span_from(start)));
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.advance();
                    TokenKind::AmpAmp
                } else {
                    return Err(Error::syntax("unexpected character '&'")
                        .with_span(self.span_from(start)));
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    return Err(Error::syntax("unexpected character '|'")
                        .with_span(self.span_from(start)));
                }
            }
            b'"' => self.scan_string(start)?,
            b'0'..=b'9' => self.scan_number(c),
            c if c == b'_' || c.is_ascii_alphabetic() => self.scan_ident(c),
            other => {
                return Err(Error::syntax(format!(
                    "unexpected character '{}'",
                    other as char
                ))
                .with_span(self.span_from(start)))
            }
        };
        Ok(Token {
            kind,
            span: self.span_from(start),
        })
    }

    fn scan_string(&mut self, start: (usize, u32, u32)) -> Result<TokenKind, Error> {
        let mut raw = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(Error::syntax("unterminated string literal")
                        .with_span(self.span_from(start)))
                }
                Some(b'"') => break,
                Some(b'\\') => {
                    raw.push('\\');
                    match self.advance() {
                        None => {
                            return Err(Error::syntax("unterminated string literal")
                                .with_span(self.span_from(start)))
                        }
                        Some(c) => raw.push(c as char),
                    }
                }
                Some(c) => raw.push(c as char),
            }
        }
        Ok(TokenKind::Str(raw))
    }

    fn scan_number(&mut self, first: u8) -> TokenKind {
        let mut s = String::new();
        s.push(first as char);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c as char);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some(b'.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            s.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    s.push(c as char);
                    self.advance();
                } else {
                    break;
                }
            }
            TokenKind::Float(s)
        } else {
            TokenKind::Int(s)
        }
    }

    fn scan_ident(&mut self, first: u8) -> TokenKind {
        let mut s = String::new();
        s.push(first as char);
        while let Some(c) = self.peek() {
            if c == b'_' || c.is_ascii_alphanumeric() {
                s.push(c as char);
                self.advance();
            } else {
                break;
            }
        }
        keyword(&s).unwrap_or(TokenKind::Ident(s))
    }
}

/// Process escapes in a raw string token's contents (spec §4.F: "escape
/// interpretation happens during AST construction").
pub fn unescape(raw: &str, span: Span) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            Some(other) => {
                return Err(
                    Error::syntax(format!("unknown escape sequence '\\{other}'")).with_span(span),
                )
            }
            None => return Err(Error::syntax("dangling escape at end of string").with_span(span)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_arithmetic() {
        let k = kinds("1 + 2 * 3");
        assert_eq!(
            k,
            vec![
                TokenKind::Int("1".into()),
                TokenKind::Plus,
                TokenKind::Int("2".into()),
                TokenKind::Star,
                TokenKind::Int("3".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_star_from_starstar() {
        let k = kinds("2**3");
        assert_eq!(
            k,
            vec![
                TokenKind::Int("2".into()),
                TokenKind::StarStar,
                TokenKind::Int("3".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn recognizes_keywords_and_identifiers() {
        let k = kinds("if x then ret");
        assert_eq!(
            k,
            vec![
                TokenKind::KwIf,
                TokenKind::Ident("x".into()),
                TokenKind::KwThen,
                TokenKind::KwRet,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_keeps_escapes_raw() {
        let k = kinds(r#""a\nb""#);
        assert_eq!(k, vec![TokenKind::Str("a\\nb".into()), TokenKind::Eof]);
    }

    #[test]
    fn unescape_resolves_known_escapes() {
        let resolved = unescape("a\\nb", Span::default()).unwrap();
        assert_eq!(resolved, "a\nb");
    }

    #[test]
    fn unterminated_string_is_syntax_error() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert_eq!(err.kind, ember_core::error::ErrorKind::SyntaxError);
    }

    #[test]
    fn float_literal_requires_digit_after_dot() {
        let k = kinds("1.5");
        assert_eq!(k, vec![TokenKind::Float("1.5".into()), TokenKind::Eof]);
    }
}
