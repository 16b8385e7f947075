//! General entities declared in the DOCTYPE internal subset.
//!
//! Replacement text is expanded lazily: [`Expansion`] yields one text piece at a
//! time and keeps only a stack of the entities currently being expanded, so
//! memory stays proportional to the declarations, never to the expanded size.
//! The caller decides how many pieces it is willing to consume, and can cap
//! the entities entered and left with [`Expansion::with_step_limit`] so that
//! references to empty or external entities cannot spin without output.

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

/// Failure to resolve a general entity reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The entity was never declared.
    #[error("undefined entity '&{0};'")]
    Undefined(String),
    /// The entity (directly or indirectly) references itself.
    #[error("recursive entity reference '&{0};'")]
    Recursive(String),
    /// A numeric character reference that does not name a character.
    #[error("invalid character reference '&{0};'")]
    InvalidCharRef(String),
    /// More entities were entered and left than the step limit allows.
    #[error("entity expansion exceeded {0} steps")]
    StepLimit(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Ref(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entity {
    Internal(Vec<Segment>),
    External,
}

/// Result of resolving a reference found in element content.
#[derive(Debug)]
pub enum Reference<'a> {
    /// A predefined entity or character reference.
    Text(Cow<'static, str>),
    /// An internal entity; iterate to obtain its replacement text.
    Expansion(Expansion<'a>),
    /// An external entity. These are never fetched.
    Skipped,
}

/// Internal general entities keyed by name.
#[derive(Debug, Default, Clone)]
pub struct EntityTable {
    entities: HashMap<String, Entity>,
}

impl EntityTable {
    /// Collects `<!ENTITY name "value">` declarations from DOCTYPE content.
    ///
    /// Parameter entities are ignored. As in XML, the first declaration of a
    /// name is binding.
    #[must_use]
    pub fn from_doctype(doctype: &str) -> Self {
        let mut entities = HashMap::new();
        let mut rest = doctype;

        while let Some(idx) = rest.find("<!ENTITY") {
            rest = &rest[idx + "<!ENTITY".len()..];
            let cursor = rest.trim_start();
            if cursor.starts_with('%') {
                continue;
            }

            let name_end = cursor
                .find(|c: char| c.is_whitespace())
                .unwrap_or(cursor.len());
            let name = &cursor[..name_end];
            let cursor = cursor[name_end..].trim_start();

            let entity = match cursor.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &cursor[1..];
                    let Some(end) = body.find(quote) else {
                        break;
                    };
                    rest = &body[end + 1..];
                    Entity::Internal(split_segments(&body[..end]))
                },
                _ if cursor.starts_with("SYSTEM") || cursor.starts_with("PUBLIC") => {
                    Entity::External
                },
                _ => continue,
            };

            if !name.is_empty() {
                entities.entry(name.to_string()).or_insert(entity);
            }
        }

        Self { entities }
    }

    /// Number of declared entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when no entity was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Resolves the reference `&name;`.
    ///
    /// # Errors
    ///
    /// Returns an [`EntityError`] for undefined entities and malformed
    /// character references.
    pub fn resolve<'a>(&'a self, name: &str) -> Result<Reference<'a>, EntityError> {
        if let Some(text) = builtin(name)? {
            return Ok(Reference::Text(text));
        }
        match self.entities.get_key_value(name) {
            Some((key, Entity::Internal(segments))) => Ok(Reference::Expansion(Expansion {
                table: self,
                stack: vec![(key.as_str(), segments.as_slice())],
                steps: 0,
                step_limit: None,
            })),
            Some((_, Entity::External)) => Ok(Reference::Skipped),
            None => Err(EntityError::Undefined(name.to_string())),
        }
    }
}

/// Lazy, depth-first expansion of one internal entity.
#[derive(Debug)]
pub struct Expansion<'a> {
    table: &'a EntityTable,
    stack: Vec<(&'a str, &'a [Segment])>,
    steps: usize,
    step_limit: Option<usize>,
}

impl<'a> Expansion<'a> {
    /// Ends the expansion with [`EntityError::StepLimit`] once more than
    /// `limit` references have been entered or entities left.
    #[must_use]
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// References entered plus entities left so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn step(&mut self) -> Result<(), EntityError> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => {
                self.stack.clear();
                Err(EntityError::StepLimit(limit))
            },
            _ => Ok(()),
        }
    }

    fn enter(&mut self, name: &'a str) -> Result<Option<Cow<'a, str>>, EntityError> {
        if let Some(text) = builtin(name)? {
            return Ok(Some(text));
        }
        if self.stack.iter().any(|(open, _)| *open == name) {
            return Err(EntityError::Recursive(name.to_string()));
        }
        match self.table.entities.get(name) {
            Some(Entity::Internal(segments)) => {
                self.stack.push((name, segments.as_slice()));
                Ok(None)
            },
            Some(Entity::External) => Ok(None),
            None => Err(EntityError::Undefined(name.to_string())),
        }
    }
}

impl<'a> Iterator for Expansion<'a> {
    type Item = Result<Cow<'a, str>, EntityError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let segments = self.stack.last().map(|(_, segments)| *segments)?;
            let Some((first, rest)) = segments.split_first() else {
                self.stack.pop();
                if let Err(err) = self.step() {
                    return Some(Err(err));
                }
                continue;
            };
            if let Some(frame) = self.stack.last_mut() {
                frame.1 = rest;
            }

            match first {
                Segment::Text(text) => return Some(Ok(Cow::Borrowed(text.as_str()))),
                Segment::Ref(name) => match self.step().and_then(|()| self.enter(name)) {
                    Ok(Some(text)) => return Some(Ok(text)),
                    Ok(None) => {},
                    Err(err) => {
                        self.stack.clear();
                        return Some(Err(err));
                    },
                },
            }
        }
    }
}

/// Predefined entities and numeric character references.
fn builtin(name: &str) -> Result<Option<Cow<'static, str>>, EntityError> {
    let text = match name {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        _ => {
            let Some(number) = name.strip_prefix('#') else {
                return Ok(None);
            };
            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => number.parse::<u32>(),
            };
            return code
                .ok()
                .and_then(char::from_u32)
                .map(|c| Some(Cow::Owned(c.to_string())))
                .ok_or_else(|| EntityError::InvalidCharRef(name.to_string()));
        },
    };
    Ok(Some(Cow::Borrowed(text)))
}

fn split_segments(value: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        let after = &rest[amp + 1..];
        match after.find(';') {
            Some(semi) if is_reference_name(&after[..semi]) => {
                if amp > 0 {
                    segments.push(Segment::Text(rest[..amp].to_string()));
                }
                segments.push(Segment::Ref(after[..semi].to_string()));
                rest = &after[semi + 1..];
            },
            _ => {
                segments.push(Segment::Text(rest[..=amp].to_string()));
                rest = after;
            },
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    segments
}

fn is_reference_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c == '&' || c == '<' || c == '"' || c == '\'')
}
