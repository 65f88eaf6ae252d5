//! Usage string parsing.
//!
//! Turns a usage string such as `register <game_id> <delay:number>
//! [<note...>]` into a [`UsageTree`], or rejects it with a positioned
//! [`UsageSyntaxError`]. Malformed usage strings are configuration faults:
//! callers are expected to surface them at registration time, not at first
//! command invocation.
//!
//! # Grammar
//!
//! ```text
//! usage       := expression
//! expression  := term+
//! term        := placeholder | placeholder-trailing | literal | optional | alternatives
//! placeholder := '<' name '>'
//! placeholder-trailing := '<' name '...>'      ; only valid in tail position
//! literal     := "'" text "'"
//! optional    := '[' expression ']'
//! alternatives:= '(' expression ('|' expression)+ ')'
//! ```
//!
//! Whitespace between tokens is insignificant; matching constraints on
//! whitespace are introduced by the pattern compiler. Placeholder names are
//! free text excluding `>`; literal text is free text excluding `'`.

use std::{iter::Peekable, str::CharIndices};

use log::debug;
use thiserror::Error;

use crate::usage::ast::{UsageNode, UsageTree};

/// A syntax error in a usage string.
///
/// Positions are byte offsets into the offending usage string.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsageSyntaxError {
    /// The usage string is empty or contains only whitespace.
    #[error("usage string is empty")]
    Empty,
    /// A `<` was never closed by a `>`.
    #[error("unterminated placeholder starting at byte {position}")]
    UnterminatedPlaceholder { position: usize },
    /// A `'` was never closed by a second `'`.
    #[error("unterminated literal starting at byte {position}")]
    UnterminatedLiteral { position: usize },
    /// A `[` or `(` was never closed.
    #[error("unterminated group starting at byte {position}")]
    UnterminatedGroup { position: usize },
    /// A placeholder with no name, such as `<>` or `<...>`.
    #[error("placeholder at byte {position} has no name")]
    EmptyPlaceholderName { position: usize },
    /// A literal with no text (`''`); a zero-width token cannot take part
    /// in whitespace-separated matching.
    #[error("literal at byte {position} is empty")]
    EmptyLiteral { position: usize },
    /// A group or alternatives branch with no terms, such as `[]` or
    /// `(<a> |)`.
    #[error("group starting at byte {position} has an empty body")]
    EmptyGroup { position: usize },
    /// An alternatives group with a single branch; use the term directly
    /// instead.
    #[error("alternatives group starting at byte {position} needs at least two branches")]
    TooFewBranches { position: usize },
    /// A character that cannot start a term, including stray `]`, `)` and
    /// `|`, or bare unquoted text.
    #[error("unexpected character `{character}` at byte {position}")]
    UnexpectedCharacter { character: char, position: usize },
    /// Any token after a trailing placeholder. This also covers a second
    /// trailing placeholder.
    #[error("nothing may follow a trailing placeholder (offending token at byte {position})")]
    TokenAfterTrailing { position: usize },
}

/// The kind of group an expression is being parsed inside, which decides
/// the characters that legally end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    TopLevel,
    Optional,
    Alternatives,
}

struct UsageParser<'u> {
    chars: Peekable<CharIndices<'u>>,
    /// Byte position of the trailing placeholder, once one has been seen.
    trailing_at: Option<usize>,
}

/// Parses a usage string into a [`UsageTree`].
///
/// # Errors
///
/// Returns a [`UsageSyntaxError`] identifying the offending token and its
/// byte position for any malformed input. See the module documentation for
/// the accepted grammar.
///
/// # Examples
///
/// ```
/// use magpie::usage::{parse_usage, UsageNode};
///
/// let tree = parse_usage("<game_id> [<note...>]").unwrap();
/// assert_eq!(tree.source(), "<game_id> [<note...>]");
/// assert!(matches!(tree.root(), UsageNode::Sequence(_)));
///
/// assert!(parse_usage("<unterminated").is_err());
/// ```
pub fn parse_usage(source: &str) -> Result<UsageTree, UsageSyntaxError> {
    debug!("parsing usage string {source:?}");

    let mut parser = UsageParser {
        chars: source.char_indices().peekable(),
        trailing_at: None,
    };

    let terms = parser.parse_expression(Group::TopLevel, 0)?;
    if terms.is_empty() {
        return Err(UsageSyntaxError::Empty);
    }

    Ok(UsageTree::new(into_node(terms), source))
}

/// Collapses a term list into a single node, avoiding one-element
/// sequences.
fn into_node(mut terms: Vec<UsageNode>) -> UsageNode {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        UsageNode::Sequence(terms)
    }
}

impl<'u> UsageParser<'u> {
    /// Parses terms until the enclosing group ends. The closing character
    /// (`]`, `)` or `|`) is left for the caller to consume.
    fn parse_expression(
        &mut self,
        group: Group,
        group_start: usize,
    ) -> Result<Vec<UsageNode>, UsageSyntaxError> {
        let mut terms = Vec::new();

        loop {
            self.skip_whitespace();

            let (position, character) = match self.chars.peek().copied() {
                Some(pair) => pair,
                None if group == Group::TopLevel => break,
                None => return Err(UsageSyntaxError::UnterminatedGroup {
                    position: group_start,
                }),
            };

            match character {
                ']' if group == Group::Optional => break,
                ')' | '|' if group == Group::Alternatives => break,
                '<' => {
                    self.reject_after_trailing(position)?;
                    terms.push(self.parse_placeholder()?);
                }
                '\'' => {
                    self.reject_after_trailing(position)?;
                    terms.push(self.parse_literal()?);
                }
                '[' => {
                    self.reject_after_trailing(position)?;
                    terms.push(self.parse_optional()?);
                }
                '(' => {
                    self.reject_after_trailing(position)?;
                    terms.push(self.parse_alternatives()?);
                }
                other => {
                    return Err(UsageSyntaxError::UnexpectedCharacter {
                        character: other,
                        position,
                    });
                }
            }
        }

        Ok(terms)
    }

    /// `<name>` or `<name...>`; the caller has peeked the `<`.
    fn parse_placeholder(&mut self) -> Result<UsageNode, UsageSyntaxError> {
        let start = self.expect_next();
        let mut name = String::new();

        loop {
            match self.chars.next() {
                None => {
                    return Err(UsageSyntaxError::UnterminatedPlaceholder { position: start });
                }
                Some((_, '>')) => break,
                Some((_, ch)) => name.push(ch),
            }
        }

        if let Some(stripped) = name.strip_suffix("...") {
            if stripped.is_empty() {
                return Err(UsageSyntaxError::EmptyPlaceholderName { position: start });
            }
            self.trailing_at = Some(start);
            Ok(UsageNode::TrailingPlaceholder(stripped.to_owned()))
        } else if name.is_empty() {
            Err(UsageSyntaxError::EmptyPlaceholderName { position: start })
        } else {
            Ok(UsageNode::Placeholder(name))
        }
    }

    /// `'text'`; the caller has peeked the opening quote.
    fn parse_literal(&mut self) -> Result<UsageNode, UsageSyntaxError> {
        let start = self.expect_next();
        let mut text = String::new();

        loop {
            match self.chars.next() {
                None => return Err(UsageSyntaxError::UnterminatedLiteral { position: start }),
                Some((_, '\'')) => break,
                Some((_, ch)) => text.push(ch),
            }
        }

        if text.is_empty() {
            return Err(UsageSyntaxError::EmptyLiteral { position: start });
        }
        Ok(UsageNode::Literal(text))
    }

    /// `[expression]`; the caller has peeked the `[`.
    fn parse_optional(&mut self) -> Result<UsageNode, UsageSyntaxError> {
        let start = self.expect_next();

        let children = self.parse_expression(Group::Optional, start)?;
        // parse_expression only breaks on a peeked `]`
        self.chars.next();

        if children.is_empty() {
            return Err(UsageSyntaxError::EmptyGroup { position: start });
        }
        Ok(UsageNode::Optional(Box::new(into_node(children))))
    }

    /// `(expression | expression ...)`; the caller has peeked the `(`.
    fn parse_alternatives(&mut self) -> Result<UsageNode, UsageSyntaxError> {
        let start = self.expect_next();
        let mut branches = Vec::new();

        loop {
            let branch = self.parse_expression(Group::Alternatives, start)?;
            if branch.is_empty() {
                return Err(UsageSyntaxError::EmptyGroup { position: start });
            }
            branches.push(into_node(branch));

            match self.chars.next() {
                Some((_, '|')) => continue,
                Some((_, ')')) => break,
                _ => return Err(UsageSyntaxError::UnterminatedGroup { position: start }),
            }
        }

        if branches.len() < 2 {
            return Err(UsageSyntaxError::TooFewBranches { position: start });
        }
        Ok(UsageNode::Alternatives(branches))
    }

    fn reject_after_trailing(&self, position: usize) -> Result<(), UsageSyntaxError> {
        match self.trailing_at {
            Some(_) => Err(UsageSyntaxError::TokenAfterTrailing { position }),
            None => Ok(()),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, ch)) if ch.is_whitespace()) {
            self.chars.next();
        }
    }

    /// Consumes the character the caller just peeked and returns its
    /// position.
    fn expect_next(&mut self) -> usize {
        match self.chars.next() {
            Some((position, _)) => position,
            // The caller always peeks before calling; an exhausted
            // iterator here would be a parser bug, not an input fault.
            None => 0,
        }
    }
}
