//! URL pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile templates such as `/users/{id}` into a segment matcher
//! - Match a concrete path exactly and extract placeholder values
//! - Match a leading prefix and return the unmatched remainder (mounts)
//!
//! # Syntax
//! ```text
//! /tacos/{pk}          one segment, any non-empty text without '/'
//! /tacos/{pk:int}      one segment, ASCII digits only
//! /static/{file:path}  the rest of the path, '/' included (last segment only)
//! ```
//!
//! # Design Decisions
//! - Segment list, no regex: matching is linear in path length and never backtracks
//! - A placeholder occupies a whole segment
//! - Exact match only: `/foo` does not match `/foo/`
//! - A missing leading slash is added at compile time

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use super::params::PathParams;

/// A template that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unbalanced brace at byte {position} in `{template}`")]
    Unbalanced { template: String, position: usize },

    #[error("placeholder `{name}` appears more than once in `{template}`")]
    DuplicateName { template: String, name: String },

    #[error("invalid placeholder name `{name}` in `{template}`")]
    InvalidName { template: String, name: String },

    #[error("unknown converter `{converter}` in `{template}`")]
    UnknownConverter { template: String, converter: String },

    #[error("segment `{segment}` mixes a placeholder with literal text in `{template}`")]
    MixedSegment { template: String, segment: String },

    #[error("`path` placeholder `{name}` must be the last segment of `{template}`")]
    MisplacedPath { template: String, name: String },
}

/// How a placeholder validates the text it captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    Str,
    Int,
    Path,
}

impl Converter {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" => Some(Converter::Str),
            "int" => Some(Converter::Int),
            "path" => Some(Converter::Path),
            _ => None,
        }
    }

    fn accepts(self, value: &str) -> bool {
        match self {
            Converter::Str => !value.is_empty() && !value.contains('/'),
            Converter::Int => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Converter::Path => !value.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, converter: Converter },
}

/// A compiled URL template.
#[derive(Debug, Clone)]
pub struct Pattern {
    template: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a template into a matcher.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let template = if template.starts_with('/') {
            template.to_string()
        } else {
            format!("/{template}")
        };

        let raw_segments: Vec<&str> = template[1..].split('/').collect();
        let last = raw_segments.len() - 1;
        let mut names = HashSet::new();
        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut offset = 1;

        for (index, raw) in raw_segments.into_iter().enumerate() {
            let segment = parse_segment(&template, raw, offset)?;
            if let Segment::Param { name, converter } = &segment {
                if !names.insert(name.clone()) {
                    return Err(PatternError::DuplicateName {
                        template: template.clone(),
                        name: name.clone(),
                    });
                }
                if *converter == Converter::Path && index != last {
                    return Err(PatternError::MisplacedPath {
                        template: template.clone(),
                        name: name.clone(),
                    });
                }
            }
            segments.push(segment);
            offset += raw.len() + 1;
        }

        Ok(Self { template, segments })
    }

    /// Join `prefix` and `template` the way router composition does:
    /// a bare `/` template collapses to the prefix itself.
    pub fn join(prefix: &str, template: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        if template == "/" || template.is_empty() {
            return prefix.to_string();
        }
        if template.starts_with('/') {
            format!("{prefix}{template}")
        } else {
            format!("{prefix}/{template}")
        }
    }

    /// Compile a copy of this pattern with `prefix` prepended.
    pub fn with_prefix(&self, prefix: &str) -> Result<Self, PatternError> {
        Self::compile(&Self::join(prefix, &self.template))
    }

    /// The normalized template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match `path` against the whole template.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        match self.walk(path)? {
            (params, "") => Some(params),
            _ => None,
        }
    }

    /// Match the template against the leading segments of `path`.
    ///
    /// Returns the captured params and the unmatched remainder, which is
    /// either empty or starts with `/`.
    pub fn match_prefix<'p>(&self, path: &'p str) -> Option<(PathParams, &'p str)> {
        self.walk(path)
    }

    fn walk<'p>(&self, path: &'p str) -> Option<(PathParams, &'p str)> {
        let mut cursor = path.strip_prefix('/')?;
        let mut params = PathParams::new();
        let count = self.segments.len();

        for (index, segment) in self.segments.iter().enumerate() {
            if let Segment::Param { name, converter: Converter::Path } = segment {
                if !Converter::Path.accepts(cursor) {
                    return None;
                }
                params.insert(name.as_str(), cursor);
                return Some((params, ""));
            }

            let (head, tail) = match cursor.find('/') {
                Some(i) => cursor.split_at(i),
                None => (cursor, ""),
            };

            match segment {
                Segment::Literal(literal) if literal == head => {}
                Segment::Param { name, converter } if converter.accepts(head) => {
                    params.insert(name.as_str(), head);
                }
                _ => return None,
            }

            if index + 1 == count {
                return Some((params, tail));
            }
            cursor = tail.strip_prefix('/')?;
        }

        Some((params, cursor))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn parse_segment(template: &str, raw: &str, offset: usize) -> Result<Segment, PatternError> {
    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();

    if opens == 0 && closes == 0 {
        return Ok(Segment::Literal(raw.to_string()));
    }

    let open = raw.find('{');
    let close = raw.find('}');
    let ordered = matches!((open, close), (Some(o), Some(c)) if o < c);
    if opens != closes || !ordered {
        let position = offset + raw.find(|c| c == '{' || c == '}').unwrap_or(0);
        return Err(PatternError::Unbalanced {
            template: template.to_string(),
            position,
        });
    }

    if opens > 1 || !raw.starts_with('{') || !raw.ends_with('}') {
        return Err(PatternError::MixedSegment {
            template: template.to_string(),
            segment: raw.to_string(),
        });
    }

    let inner = &raw[1..raw.len() - 1];
    let (name, converter) = match inner.split_once(':') {
        Some((name, converter)) => {
            let converter =
                Converter::from_name(converter).ok_or_else(|| PatternError::UnknownConverter {
                    template: template.to_string(),
                    converter: converter.to_string(),
                })?;
            (name, converter)
        }
        None => (inner, Converter::Str),
    };

    if !is_identifier(name) {
        return Err(PatternError::InvalidName {
            template: template.to_string(),
            name: name.to_string(),
        });
    }

    Ok(Segment::Param {
        name: name.to_string(),
        converter,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
