//! Filename template language.
//!
//! ```text
//! {date}[_{direction}][_sim{sim_slot}][_{phone_number}]
//! ```
//!
//! - `{name}` / `{name:arg}` reference a variable.
//! - `[ ... ]` is an optional group, emitted only when every variable inside
//!   it resolved to a value.
//! - `\` escapes the next character.

use std::fmt;
use std::str::FromStr;

use crate::models::error::TemplateError;

/// A recognized template variable with its sub-argument, if it takes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// Call timestamp, optionally with a custom strftime-style pattern.
    Date { pattern: Option<String> },
    Direction,
    /// One-based SIM slot.
    SimSlot,
    PhoneNumber,
    CallerName,
    ContactName,
}

impl Variable {
    fn parse(name: &str, arg: Option<String>, position: usize) -> Result<Self, TemplateError> {
        let var = match name {
            "date" => return Ok(Self::Date { pattern: arg }),
            "direction" => Self::Direction,
            "sim_slot" => Self::SimSlot,
            "phone_number" => Self::PhoneNumber,
            "caller_name" => Self::CallerName,
            "contact_name" => Self::ContactName,
            other => return Err(TemplateError::UnknownVariable(other.to_string())),
        };
        if arg.is_some() {
            return Err(TemplateError::Syntax {
                position,
                message: format!("variable '{}' does not take an argument", name),
            });
        }
        Ok(var)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Date { .. } => "date",
            Self::Direction => "direction",
            Self::SimSlot => "sim_slot",
            Self::PhoneNumber => "phone_number",
            Self::CallerName => "caller_name",
            Self::ContactName => "contact_name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Variable(Variable),
    Group(Vec<Token>),
}

/// Parsed filename template. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        let mut parser = Parser { chars, pos: 0 };
        let tokens = parser.parse_sequence(false)?;
        Ok(Self { tokens })
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn syntax(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Syntax {
            position: self.pos,
            message: message.into(),
        }
    }

    fn parse_sequence(&mut self, in_group: bool) -> Result<Vec<Token>, TemplateError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();

        while let Some(&c) = self.chars.get(self.pos) {
            match c {
                '\\' => {
                    let escaped = *self
                        .chars
                        .get(self.pos + 1)
                        .ok_or_else(|| self.syntax("dangling escape"))?;
                    literal.push(escaped);
                    self.pos += 2;
                }
                '{' => {
                    flush_literal(&mut tokens, &mut literal);
                    tokens.push(Token::Variable(self.parse_variable()?));
                }
                '[' => {
                    flush_literal(&mut tokens, &mut literal);
                    let start = self.pos;
                    self.pos += 1;
                    let inner = self.parse_sequence(true)?;
                    if self.chars.get(self.pos) != Some(&']') {
                        return Err(TemplateError::Syntax {
                            position: start,
                            message: "unterminated group".into(),
                        });
                    }
                    self.pos += 1;
                    tokens.push(Token::Group(inner));
                }
                ']' if in_group => break,
                ']' | '}' => return Err(self.syntax(format!("unexpected '{}'", c))),
                _ => {
                    literal.push(c);
                    self.pos += 1;
                }
            }
        }

        flush_literal(&mut tokens, &mut literal);
        Ok(tokens)
    }

    fn parse_variable(&mut self) -> Result<Variable, TemplateError> {
        let start = self.pos;
        self.pos += 1;

        let mut name = String::new();
        let mut arg: Option<String> = None;

        loop {
            let Some(&c) = self.chars.get(self.pos) else {
                return Err(TemplateError::Syntax {
                    position: start,
                    message: "unterminated variable".into(),
                });
            };
            self.pos += 1;

            if c == '}' {
                break;
            }

            if let Some(a) = arg.as_mut() {
                if c == '\\' {
                    let escaped = *self
                        .chars
                        .get(self.pos)
                        .ok_or_else(|| self.syntax("dangling escape"))?;
                    a.push(escaped);
                    self.pos += 1;
                } else {
                    a.push(c);
                }
            } else if c == ':' {
                arg = Some(String::new());
            } else if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
            } else {
                return Err(TemplateError::Syntax {
                    position: self.pos - 1,
                    message: format!("invalid character '{}' in variable name", c),
                });
            }
        }

        if name.is_empty() {
            return Err(TemplateError::Syntax {
                position: start,
                message: "empty variable name".into(),
            });
        }

        Variable::parse(&name, arg, start)
    }
}

fn flush_literal(tokens: &mut Vec<Token>, literal: &mut String) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_tokens(f: &mut fmt::Formatter<'_>, tokens: &[Token]) -> fmt::Result {
            for token in tokens {
                match token {
                    Token::Literal(text) => {
                        for c in text.chars() {
                            if matches!(c, '\\' | '{' | '}' | '[' | ']') {
                                write!(f, "\\")?;
                            }
                            write!(f, "{}", c)?;
                        }
                    }
                    Token::Variable(Variable::Date { pattern: Some(p) }) => {
                        write!(f, "{{date:")?;
                        for c in p.chars() {
                            if matches!(c, '\\' | '}') {
                                write!(f, "\\")?;
                            }
                            write!(f, "{}", c)?;
                        }
                        write!(f, "}}")?;
                    }
                    Token::Variable(v) => write!(f, "{{{}}}", v.name())?,
                    Token::Group(inner) => {
                        write!(f, "[")?;
                        write_tokens(f, inner)?;
                        write!(f, "]")?;
                    }
                }
            }
            Ok(())
        }
        write_tokens(f, &self.tokens)
    }
}
