//! Normalization of human-typed model identifiers.
//!
//! Users type things like `llama3`, `llama3.1`, or `qwen2.5-coder:7b`. The
//! daemon wants `name:tag`, so everything funnels through
//! [`ModelIdentifier::normalize`]. The parsing strategy sits behind
//! [`IdentifierParser`] so callers never depend on how names are split.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

pub const DEFAULT_TAG: &str = "latest";

/// A canonical `name:tag` identifier. Equality is defined on the canonical
/// string, which is what the derived impls compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    name: String,
    tag: String,
}

/// Raw pieces pulled out of user input by an [`IdentifierParser`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedIdentifier {
    pub name: String,
    /// `None` (or an empty string) means the input carried no usable tag.
    pub tag: Option<String>,
    /// Anything left over after the name and tag were consumed.
    pub remainder: String,
}

/// Splits free-form input into a name, an optional tag, and leftovers.
pub trait IdentifierParser {
    fn parse(&self, input: &str) -> ParsedIdentifier;
}

/// Pattern-based splitter. Names are ASCII word characters and hyphens with at
/// most one embedded `.segment` (so `llama3.1` and `qwen2.5-coder` survive);
/// the tag uses the same class after a single `:`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternParser;

static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<name>[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)?)?(?::(?P<tag>[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)?)?)?",
    )
    .expect("identifier pattern is valid")
});

impl IdentifierParser for PatternParser {
    fn parse(&self, input: &str) -> ParsedIdentifier {
        let Some(captures) = IDENTIFIER_PATTERN.captures(input) else {
            return ParsedIdentifier {
                remainder: input.trim().to_string(),
                ..ParsedIdentifier::default()
            };
        };

        let consumed = captures.get(0).map_or(0, |m| m.end());
        ParsedIdentifier {
            name: captures
                .name("name")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            tag: captures.name("tag").map(|m| m.as_str().to_string()),
            remainder: input[consumed..].trim().to_string(),
        }
    }
}

/// Result of normalizing input, with whatever was thrown away so callers can
/// warn about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub id: ModelIdentifier,
    pub discarded: Option<String>,
}

impl ModelIdentifier {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            name: name.into(),
            tag: if tag.is_empty() {
                DEFAULT_TAG.to_string()
            } else {
                tag
            },
        }
    }

    /// Normalizes with the default [`PatternParser`]. Never fails: a missing
    /// or malformed tag becomes `latest`, and existence is the caller's
    /// problem.
    pub fn normalize(input: &str) -> Self {
        Self::normalize_with(&PatternParser, input).id
    }

    pub fn normalize_with(parser: &impl IdentifierParser, input: &str) -> Normalized {
        let parsed = parser.parse(input);
        let discarded = if parsed.remainder.is_empty() {
            None
        } else {
            warn!(
                input = %input,
                discarded = %parsed.remainder,
                "Ignoring trailing characters in model identifier"
            );
            Some(parsed.remainder)
        };

        Normalized {
            id: Self::new(parsed.name, parsed.tag.unwrap_or_default()),
            discarded,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn canonical(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}
