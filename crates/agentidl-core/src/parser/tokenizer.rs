//! IDL tokenizer - converts interface-definition text into a token stream
//!
//! Handles: definition keywords, identifiers, string literals (kept verbatim,
//! quotes included), integer/float literals, symbols, and the `...` variadic
//! marker. Line (`//`) and block (`/* */`) comments are discarded.
//!
//! Guarantees:
//! - Deterministic: same input always produces same token stream
//! - Every error carries a line:column position

/// Token types for IDL syntax
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Definition keywords
    Interface,
    Partial,
    Dictionary,
    Enum,
    Typedef,

    // Member keywords
    Attribute,
    Readonly,
    Optional,
    Required,
    Const,
    Or,

    // Literals
    StringLiteral(String),
    IntegerLiteral(i64),
    FloatLiteral(f64),

    // Symbols
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    LParen,    // (
    RParen,    // )
    LAngle,    // <
    RAngle,    // >
    Colon,     // :
    Semicolon, // ;
    Comma,     // ,
    Equals,    // =
    Question,  // ?
    Ellipsis,  // ...

    // Other
    Identifier(String),
    Eof,
}

impl Token {
    /// Source text of keyword tokens, which may also appear as plain names
    pub fn keyword_text(&self) -> Option<&'static str> {
        match self {
            Token::Interface => Some("interface"),
            Token::Partial => Some("partial"),
            Token::Dictionary => Some("dictionary"),
            Token::Enum => Some("enum"),
            Token::Typedef => Some("typedef"),
            Token::Attribute => Some("attribute"),
            Token::Readonly => Some("readonly"),
            Token::Optional => Some("optional"),
            Token::Required => Some("required"),
            Token::Const => Some("const"),
            Token::Or => Some("or"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(kw) = self.keyword_text() {
            return write!(f, "'{}'", kw);
        }
        match self {
            Token::StringLiteral(s) => write!(f, "string {}", s),
            Token::IntegerLiteral(i) => write!(f, "integer {}", i),
            Token::FloatLiteral(v) => write!(f, "float {}", v),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LAngle => write!(f, "'<'"),
            Token::RAngle => write!(f, "'>'"),
            Token::Colon => write!(f, "':'"),
            Token::Semicolon => write!(f, "';'"),
            Token::Comma => write!(f, "','"),
            Token::Equals => write!(f, "'='"),
            Token::Question => write!(f, "'?'"),
            Token::Ellipsis => write!(f, "'...'"),
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Eof => write!(f, "end of input"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Position in source text for error reporting
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token with source position
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenizer for IDL source text
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Tokenizer {
    /// Create a new tokenizer for the given input text
    pub fn new(text: &str) -> Self {
        Tokenizer {
            input: text.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input into a stream of spanned tokens
    pub fn tokenize(&mut self) -> crate::Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span: self.current_span(),
                });
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    // ── Character helpers ──────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    // ── Whitespace & Comments ──────────────────────────────

    fn skip_whitespace_and_comments(&mut self) -> crate::Result<()> {
        loop {
            while let Some(ch) = self.peek() {
                if ch.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            if self.peek() == Some('/') && self.peek_ahead(1) == Some('/') {
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_ahead(1) == Some('*') {
                let start = self.current_span();
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        None => {
                            return Err(crate::Error::ParseError(format!(
                                "Unterminated block comment starting at {}",
                                start
                            )));
                        }
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        Some(_) => {}
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    // ── Main dispatch ──────────────────────────────────────

    fn next_token(&mut self) -> crate::Result<SpannedToken> {
        let span = self.current_span();
        let ch = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(SpannedToken { token: Token::Eof, span });
            }
        };

        let symbol = match ch {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '<' => Some(Token::LAngle),
            '>' => Some(Token::RAngle),
            ':' => Some(Token::Colon),
            ';' => Some(Token::Semicolon),
            ',' => Some(Token::Comma),
            '=' => Some(Token::Equals),
            '?' => Some(Token::Question),
            _ => None,
        };
        if let Some(token) = symbol {
            self.advance();
            return Ok(SpannedToken { token, span });
        }

        match ch {
            '"' => self.read_string(span),
            '.' => self.read_ellipsis(span),
            '-' if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number(span)
            }
            c if c.is_ascii_digit() => self.read_number(span),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier_or_keyword(span),
            _ => Err(crate::Error::ParseError(format!(
                "Unexpected character '{}' at {}",
                ch, span
            ))),
        }
    }

    // ── String literals ────────────────────────────────────

    /// IDL strings have no escapes; the literal is kept with its quotes.
    fn read_string(&mut self, span: Span) -> crate::Result<SpannedToken> {
        let start = self.position;
        self.advance(); // consume opening "

        loop {
            match self.advance() {
                None => {
                    return Err(crate::Error::ParseError(format!(
                        "Unterminated string starting at {}",
                        span
                    )));
                }
                Some('"') => break,
                Some(_) => {}
            }
        }

        let raw: String = self.input[start..self.position].iter().collect();
        Ok(SpannedToken {
            token: Token::StringLiteral(raw),
            span,
        })
    }

    fn read_ellipsis(&mut self, span: Span) -> crate::Result<SpannedToken> {
        if self.peek_ahead(1) == Some('.') && self.peek_ahead(2) == Some('.') {
            self.advance();
            self.advance();
            self.advance();
            Ok(SpannedToken {
                token: Token::Ellipsis,
                span,
            })
        } else {
            Err(crate::Error::ParseError(format!(
                "Unexpected character '.' at {}",
                span
            )))
        }
    }

    // ── Numbers ────────────────────────────────────────────

    fn read_number(&mut self, span: Span) -> crate::Result<SpannedToken> {
        let start = self.position;
        let mut has_dot = false;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !has_dot && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();

        if has_dot {
            let val: f64 = text.parse().map_err(|_| {
                crate::Error::ParseError(format!("Invalid float '{}' at {}", text, span))
            })?;
            Ok(SpannedToken {
                token: Token::FloatLiteral(val),
                span,
            })
        } else {
            let val: i64 = text.parse().map_err(|_| {
                crate::Error::ParseError(format!("Invalid integer '{}' at {}", text, span))
            })?;
            Ok(SpannedToken {
                token: Token::IntegerLiteral(val),
                span,
            })
        }
    }

    // ── Identifiers & Keywords ─────────────────────────────

    fn read_identifier_or_keyword(&mut self, span: Span) -> crate::Result<SpannedToken> {
        let start = self.position;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();

        let token = match text.as_str() {
            "interface" => Token::Interface,
            "partial" => Token::Partial,
            "dictionary" => Token::Dictionary,
            "enum" => Token::Enum,
            "typedef" => Token::Typedef,
            "attribute" => Token::Attribute,
            "readonly" => Token::Readonly,
            "optional" => Token::Optional,
            "required" => Token::Required,
            "const" => Token::Const,
            "or" => Token::Or,
            _ => Token::Identifier(text),
        };

        Ok(SpannedToken { token, span })
    }
}
