//! Recognizer grammar generation.
//!
//! Lowers the non-excluded shape descriptors into PEG token sequences and
//! renders them as one ordered-choice `lookup` rule. Only the regex subset
//! the catalog uses is understood: anchors, escaped literals, character
//! classes, groups, `.` and the `?`, `*`, `+` quantifiers. Anything else is
//! reported as [`MappingError::UnsupportedShapeSyntax`] rather than guessed.

use serde::Serialize;

use crate::error::{MappingError, Result};
use crate::patterns::PatternCatalog;

/// One lowered element of a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeAtom {
    /// A run of literal characters.
    Literal(String),
    /// A bracketed character class, without the brackets.
    Class(String),
    /// Any single character.
    Any,
    /// A parenthesized sub-sequence.
    Group(Vec<ShapeTerm>),
}

/// An atom with its optional quantifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeTerm {
    pub atom: ShapeAtom,
    pub quantifier: Option<char>,
}

impl ShapeTerm {
    fn literal(ch: char) -> Self {
        Self {
            atom: ShapeAtom::Literal(ch.to_string()),
            quantifier: None,
        }
    }
}

struct Lowering<'a> {
    pattern: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Lowering<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            chars: pattern.char_indices().collect(),
            pos: 0,
        }
    }

    fn error(&self, position: usize, reason: impl Into<String>) -> MappingError {
        MappingError::UnsupportedShapeSyntax {
            pattern: self.pattern.to_string(),
            position,
            reason: reason.into(),
        }
    }

    fn next(&mut self) -> Option<(usize, char)> {
        let item = self.chars.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn sequence(&mut self, in_group: bool) -> Result<Vec<ShapeTerm>> {
        let mut terms: Vec<ShapeTerm> = Vec::new();

        while let Some((offset, ch)) = self.next() {
            match ch {
                '^' if offset == 0 => {}
                '$' if self.pos == self.chars.len() => {}
                '^' | '$' => return Err(self.error(offset, "anchor inside the pattern")),
                '\\' => {
                    let (escaped_at, escaped) = self
                        .next()
                        .ok_or_else(|| self.error(offset, "dangling escape"))?;
                    if escaped.is_ascii_alphanumeric() {
                        return Err(self.error(escaped_at, format!("escape class \\{escaped}")));
                    }
                    push_literal(&mut terms, escaped);
                }
                '[' => {
                    let body = self.class(offset)?;
                    terms.push(ShapeTerm {
                        atom: ShapeAtom::Class(body),
                        quantifier: None,
                    });
                }
                '(' => {
                    if self.chars.get(self.pos).is_some_and(|(_, next)| *next == '?') {
                        return Err(self.error(offset, "group flags"));
                    }
                    let inner = self.sequence(true)?;
                    terms.push(ShapeTerm {
                        atom: ShapeAtom::Group(inner),
                        quantifier: None,
                    });
                }
                ')' if in_group => return Ok(terms),
                ')' => return Err(self.error(offset, "unbalanced ')'")),
                '?' | '*' | '+' => quantify(&mut terms, ch).map_err(|reason| self.error(offset, reason))?,
                '{' => return Err(self.error(offset, "counted repetition")),
                '|' => return Err(self.error(offset, "alternation")),
                '.' => terms.push(ShapeTerm {
                    atom: ShapeAtom::Any,
                    quantifier: None,
                }),
                other => push_literal(&mut terms, other),
            }
        }

        if in_group {
            return Err(self.error(self.pattern.len(), "unclosed group"));
        }
        Ok(terms)
    }

    fn class(&mut self, start: usize) -> Result<String> {
        let mut body = String::new();
        let mut first = true;
        loop {
            let (offset, ch) = self
                .next()
                .ok_or_else(|| self.error(start, "unclosed character class"))?;
            match ch {
                ']' if !first && body != "^" => return Ok(body),
                '\\' => {
                    let (_, escaped) = self
                        .next()
                        .ok_or_else(|| self.error(offset, "dangling escape"))?;
                    if escaped == '}' {
                        body.push('}');
                    } else {
                        body.push('\\');
                        body.push(escaped);
                    }
                }
                '[' => return Err(self.error(offset, "nested character class")),
                other => body.push(other),
            }
            first = false;
        }
    }
}

fn push_literal(terms: &mut Vec<ShapeTerm>, ch: char) {
    if let Some(ShapeTerm {
        atom: ShapeAtom::Literal(text),
        quantifier: None,
    }) = terms.last_mut()
    {
        text.push(ch);
        return;
    }
    terms.push(ShapeTerm::literal(ch));
}

fn quantify(terms: &mut Vec<ShapeTerm>, quantifier: char) -> std::result::Result<(), &'static str> {
    let last = terms.last_mut().ok_or("quantifier without an atom")?;
    if last.quantifier.is_some() {
        return Err("stacked quantifiers");
    }
    // A quantifier binds to the final character of a literal run only.
    if let ShapeAtom::Literal(text) = &mut last.atom {
        if text.chars().count() > 1 {
            let tail = text.pop().ok_or("quantifier without an atom")?;
            terms.push(ShapeTerm {
                atom: ShapeAtom::Literal(tail.to_string()),
                quantifier: Some(quantifier),
            });
            return Ok(());
        }
    }
    last.quantifier = Some(quantifier);
    Ok(())
}

/// Parses an anchored shape pattern into terms.
///
/// # Errors
///
/// Returns [`MappingError::UnsupportedShapeSyntax`] for syntax outside the
/// supported subset.
pub fn lower_shape(pattern: &str) -> Result<Vec<ShapeTerm>> {
    Lowering::new(pattern).sequence(false)
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        if ch == '\\' || ch == '"' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Renders terms as a space-separated PEG expression.
///
/// # Examples
///
/// ```
/// use texmap_core::grammar::{lower_shape, render_terms};
///
/// let terms = lower_shape(r"^\\[0-9a-zA-Z]+$").unwrap();
/// assert_eq!(render_terms(&terms), r#""\\" [0-9a-zA-Z]+"#);
/// ```
pub fn render_terms(terms: &[ShapeTerm]) -> String {
    terms
        .iter()
        .map(|term| {
            let mut rendered = match &term.atom {
                ShapeAtom::Literal(text) => quote(text),
                ShapeAtom::Class(body) => format!("[{body}]"),
                ShapeAtom::Any => ".".to_string(),
                ShapeAtom::Group(inner) => format!("({})", render_terms(inner)),
            };
            if let Some(quantifier) = term.quantifier {
                rendered.push(quantifier);
            }
            rendered
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One alternative of the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognizerRule {
    /// Index of the source descriptor in the catalog.
    pub index: usize,
    /// Rendered PEG token sequence.
    pub tokens: String,
    /// Whether the shape ends without a terminator.
    pub terminated: bool,
}

/// Lowers every non-excluded descriptor, in catalog order.
pub fn recognizer_rules(catalog: &PatternCatalog) -> Result<Vec<RecognizerRule>> {
    catalog
        .descriptors()
        .iter()
        .enumerate()
        .filter(|(_, descriptor)| !descriptor.exclude)
        .map(|(index, descriptor)| {
            Ok(RecognizerRule {
                index,
                tokens: render_terms(&lower_shape(descriptor.pattern)?),
                terminated: descriptor.terminated,
            })
        })
        .collect()
}

const TOKENS_COLUMN: usize = 70;
const TERMINATOR_COLUMN: usize = 85;
const PREDICATE_COLUMN: usize = 110;

/// Renders the rules as the body of the `lookup` grammar rule.
pub fn render_rules(rules: &[RecognizerRule]) -> String {
    let mut out = String::from("lookup\n");
    for (position, rule) in rules.iter().enumerate() {
        let choice = if position == 0 { '=' } else { '/' };
        let mut line = format!("  {choice} text:({})", rule.tokens);
        if !rule.terminated {
            line = format!("{line:<TOKENS_COLUMN$} terminator");
        }
        line = format!("{line:<TERMINATOR_COLUMN$} &{{ return lookup(text, {}); }}", rule.index);
        line = format!("{line:<PREDICATE_COLUMN$}{{ return lookup(text); }}");
        out.push_str(&line);
        out.push('\n');
    }
    out
}
