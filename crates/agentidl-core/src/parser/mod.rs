//! IDL parser - tokenizer, AST types, and recursive descent parser
//!
//! Converts interface-definition text into a [`Definitions`] tree. The
//! accepted grammar is the subset the compiler needs: interfaces (with
//! attributes, constants and operations), dictionaries, enums, typedefs,
//! extension attributes, and union / generic / nullable types. Base-grammar
//! errors are rejected here, before any core algorithm sees the tree.

pub mod ast;
pub mod tokenizer;

use crate::types::TypeDescriptor;
use crate::{Error, Result};
use ast::*;
use tokenizer::{Span, SpannedToken, Token, Tokenizer};

/// Parse IDL text into its definition AST
///
/// # Guarantees
/// - Deterministic: same input always produces same AST
///
/// # Errors
/// Returns `ParseError` with line:column for syntax violations.
///
/// # Example
/// ```
/// let defs = agentidl_core::parser::parse(
///     r#"[Context="https://example.org/ctx"] interface Wallet { boolean ping(); };"#,
/// ).unwrap();
/// assert_eq!(defs.len(), 1);
/// ```
pub fn parse(input: &str) -> Result<Definitions> {
    let tokens = Tokenizer::new(input).tokenize()?;
    Parser::new(tokens).parse_definitions()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser { tokens, pos: 0 }
    }

    // ── Token helpers ──────────────────────────────────────

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span.clone())
            .unwrap_or(Span {
                line: 1,
                column: 1,
                offset: 0,
            })
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == expected
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", expected)))
        }
    }

    fn error(&self, what: &str) -> Error {
        Error::ParseError(format!("{}, found {} at {}", what, self.peek(), self.span()))
    }

    fn is_ident(&self, text: &str) -> bool {
        matches!(self.peek(), Token::Identifier(name) if name == text)
    }

    /// An identifier, or a keyword used in name position
    fn expect_name(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => match other.keyword_text() {
                Some(text) => {
                    self.advance();
                    Ok(text.to_string())
                }
                None => Err(self.error("expected identifier")),
            },
        }
    }

    // ── Definitions ────────────────────────────────────────

    fn parse_definitions(&mut self) -> Result<Definitions> {
        let mut definitions = Vec::new();
        while !self.check(&Token::Eof) {
            let ext_attrs = self.parse_ext_attrs()?;
            self.eat(&Token::Partial);
            let definition = match self.peek() {
                Token::Interface => Definition::Interface(self.parse_interface(ext_attrs)?),
                Token::Dictionary => Definition::Dictionary(self.parse_dictionary(ext_attrs)?),
                Token::Enum => Definition::Enum(self.parse_enum(ext_attrs)?),
                Token::Typedef => Definition::Typedef(self.parse_typedef(ext_attrs)?),
                _ => return Err(self.error("expected definition")),
            };
            definitions.push(definition);
        }
        Ok(definitions)
    }

    fn parse_interface(&mut self, ext_attrs: Vec<ExtAttr>) -> Result<InterfaceNode> {
        self.expect(&Token::Interface)?;
        if self.is_ident("mixin") {
            self.advance();
        }
        let name = self.expect_name()?;
        let inheritance = if self.eat(&Token::Colon) {
            Some(self.expect_name()?)
        } else {
            None
        };
        self.expect(&Token::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&Token::RBrace) {
            members.push(self.parse_member()?);
        }
        self.expect(&Token::RBrace)?;
        self.expect(&Token::Semicolon)?;

        Ok(InterfaceNode {
            name,
            inheritance,
            members,
            ext_attrs,
        })
    }

    fn parse_member(&mut self) -> Result<Member> {
        let ext_attrs = self.parse_ext_attrs()?;

        if self.eat(&Token::Const) {
            self.parse_type()?;
            self.expect_name()?;
            self.expect(&Token::Equals)?;
            self.skip_default_value()?;
            self.expect(&Token::Semicolon)?;
            return Ok(Member::Other);
        }

        while self.is_ident("static")
            || self.is_ident("stringifier")
            || self.is_ident("getter")
            || self.is_ident("setter")
            || self.is_ident("deleter")
        {
            self.advance();
        }

        if self.check(&Token::Readonly) || self.check(&Token::Attribute) {
            let readonly = self.eat(&Token::Readonly);
            self.expect(&Token::Attribute)?;
            let idl_type = self.parse_type()?;
            let name = self.expect_name()?;
            self.expect(&Token::Semicolon)?;
            return Ok(Member::Attribute(AttributeNode {
                name,
                idl_type: Some(idl_type),
                readonly,
                ext_attrs,
            }));
        }

        let idl_type = self.parse_type()?;
        let name = if self.check(&Token::LParen) {
            String::new()
        } else {
            self.expect_name()?
        };
        self.expect(&Token::LParen)?;
        let arguments = self.parse_arguments()?;
        self.expect(&Token::RParen)?;
        self.expect(&Token::Semicolon)?;

        Ok(Member::Operation(OperationNode {
            name,
            idl_type: Some(idl_type),
            arguments,
            ext_attrs,
        }))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>> {
        let mut arguments = Vec::new();
        if self.check(&Token::RParen) {
            return Ok(arguments);
        }
        loop {
            let ext_attrs = self.parse_ext_attrs()?;
            let optional = self.eat(&Token::Optional);
            let idl_type = self.parse_type()?;
            let variadic = self.eat(&Token::Ellipsis);
            let name = self.expect_name()?;
            if optional && self.eat(&Token::Equals) {
                self.skip_default_value()?;
            }
            arguments.push(Argument {
                name,
                idl_type,
                optional,
                variadic,
                ext_attrs,
            });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_dictionary(&mut self, ext_attrs: Vec<ExtAttr>) -> Result<DictionaryNode> {
        self.expect(&Token::Dictionary)?;
        let name = self.expect_name()?;
        let inheritance = if self.eat(&Token::Colon) {
            Some(self.expect_name()?)
        } else {
            None
        };
        self.expect(&Token::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&Token::RBrace) {
            let field_attrs = self.parse_ext_attrs()?;
            let required = self.eat(&Token::Required);
            let idl_type = self.parse_type()?;
            let field_name = self.expect_name()?;
            if self.eat(&Token::Equals) {
                self.skip_default_value()?;
            }
            self.expect(&Token::Semicolon)?;
            members.push(FieldNode {
                name: field_name,
                idl_type,
                required,
                ext_attrs: field_attrs,
            });
        }
        self.expect(&Token::RBrace)?;
        self.expect(&Token::Semicolon)?;

        Ok(DictionaryNode {
            name,
            inheritance,
            members,
            ext_attrs,
        })
    }

    fn parse_enum(&mut self, ext_attrs: Vec<ExtAttr>) -> Result<EnumNode> {
        self.expect(&Token::Enum)?;
        let name = self.expect_name()?;
        self.expect(&Token::LBrace)?;

        let mut values = Vec::new();
        while let Token::StringLiteral(raw) = self.peek().clone() {
            self.advance();
            values.push(raw.trim_matches('"').to_string());
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        if values.is_empty() {
            return Err(self.error("expected enum value"));
        }
        self.expect(&Token::RBrace)?;
        self.expect(&Token::Semicolon)?;

        Ok(EnumNode {
            name,
            values,
            ext_attrs,
        })
    }

    fn parse_typedef(&mut self, ext_attrs: Vec<ExtAttr>) -> Result<TypedefNode> {
        self.expect(&Token::Typedef)?;
        self.parse_ext_attrs()?;
        let idl_type = self.parse_type()?;
        let name = self.expect_name()?;
        self.expect(&Token::Semicolon)?;
        Ok(TypedefNode {
            name,
            idl_type,
            ext_attrs,
        })
    }

    // ── Types ──────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<TypeDescriptor> {
        let base = if self.eat(&Token::LParen) {
            let mut members = vec![self.parse_type()?];
            while self.eat(&Token::Or) {
                members.push(self.parse_type()?);
            }
            if members.len() < 2 {
                return Err(self.error("expected 'or' in union type"));
            }
            self.expect(&Token::RParen)?;
            TypeDescriptor::Union(members)
        } else {
            self.parse_single_type()?
        };

        if self.eat(&Token::Question) {
            Ok(TypeDescriptor::Nullable(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    fn parse_single_type(&mut self) -> Result<TypeDescriptor> {
        let first = match self.peek().clone() {
            Token::Identifier(name) => {
                self.advance();
                name
            }
            _ => return Err(self.error("expected type")),
        };

        // Multi-word primitives collapse to one space-separated name
        let name = match first.as_str() {
            "unsigned" => {
                let word = self.expect_name()?;
                match word.as_str() {
                    "short" => "unsigned short".to_string(),
                    "long" if self.is_ident("long") => {
                        self.advance();
                        "unsigned long long".to_string()
                    }
                    "long" => "unsigned long".to_string(),
                    _ => return Err(self.error("expected 'short' or 'long' after 'unsigned'")),
                }
            }
            "unrestricted" => {
                let word = self.expect_name()?;
                match word.as_str() {
                    "float" | "double" => format!("unrestricted {}", word),
                    _ => {
                        return Err(
                            self.error("expected 'float' or 'double' after 'unrestricted'")
                        )
                    }
                }
            }
            "long" if self.is_ident("long") => {
                self.advance();
                "long long".to_string()
            }
            _ => first,
        };

        if self.eat(&Token::LAngle) {
            let mut args = vec![self.parse_type()?];
            while self.eat(&Token::Comma) {
                args.push(self.parse_type()?);
            }
            self.expect(&Token::RAngle)?;
            return Ok(TypeDescriptor::Generic { kind: name, args });
        }

        Ok(TypeDescriptor::Primitive(name))
    }

    // ── Extension attributes ───────────────────────────────

    fn parse_ext_attrs(&mut self) -> Result<Vec<ExtAttr>> {
        let mut attrs = Vec::new();
        if !self.eat(&Token::LBracket) {
            return Ok(attrs);
        }
        loop {
            attrs.push(self.parse_ext_attr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(attrs)
    }

    fn parse_ext_attr(&mut self) -> Result<ExtAttr> {
        let name = self.expect_name()?;
        let rhs = if self.eat(&Token::Equals) {
            Some(self.parse_ext_attr_value()?)
        } else {
            None
        };
        // `[Attr(args)]` / `[Attr=Name(args)]` argument lists carry nothing the core reads
        if self.check(&Token::LParen) {
            self.skip_balanced_parens()?;
        }
        Ok(ExtAttr { name, rhs })
    }

    fn parse_ext_attr_value(&mut self) -> Result<ExtAttrValue> {
        match self.peek().clone() {
            Token::StringLiteral(raw) => {
                self.advance();
                Ok(ExtAttrValue::String(raw))
            }
            Token::IntegerLiteral(i) => {
                self.advance();
                Ok(ExtAttrValue::Identifier(i.to_string()))
            }
            Token::FloatLiteral(v) => {
                self.advance();
                Ok(ExtAttrValue::Identifier(v.to_string()))
            }
            Token::LParen => {
                self.advance();
                let mut names = vec![self.expect_name()?];
                while self.eat(&Token::Comma) {
                    names.push(self.expect_name()?);
                }
                self.expect(&Token::RParen)?;
                Ok(ExtAttrValue::IdentifierList(names))
            }
            _ => {
                // Compact `prefix:local` identifiers are accepted unquoted
                let mut value = self.expect_name()?;
                while self.check(&Token::Colon)
                    && matches!(self.peek_at(1), Token::Identifier(_))
                {
                    self.advance();
                    value.push(':');
                    value.push_str(&self.expect_name()?);
                }
                Ok(ExtAttrValue::Identifier(value))
            }
        }
    }

    // ── Skipped constructs ─────────────────────────────────

    fn skip_default_value(&mut self) -> Result<()> {
        match self.peek() {
            Token::StringLiteral(_)
            | Token::IntegerLiteral(_)
            | Token::FloatLiteral(_)
            | Token::Identifier(_) => {
                self.advance();
                Ok(())
            }
            Token::LBracket => {
                self.advance();
                self.expect(&Token::RBracket)
            }
            Token::LBrace => {
                self.advance();
                self.expect(&Token::RBrace)
            }
            _ => Err(self.error("expected default value")),
        }
    }

    fn skip_balanced_parens(&mut self) -> Result<()> {
        self.expect(&Token::LParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => return Err(self.error("unbalanced parentheses")),
                _ => {}
            }
        }
        Ok(())
    }
}
