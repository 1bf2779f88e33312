use std::error;
use std::fmt::{self, Display, Formatter};

/// Errors trying to parse a negotiation header.
///
/// All malformed-input cases are detected while parsing, before any variant
/// matching happens, and fail the whole header family's parse: there is no
/// partial or degraded negotiation on a parse error.
#[derive(Debug)]
pub struct Error {
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    MalformedQuality(String),
    EmptyField,
    UnsupportedParameter(String),
    MalformedParameter(String),
    UnclosedQuotes(String),
    MalformedMediaRange(String),
    MalformedLanguageTag(String),
    InvalidHeaderValue,
}

impl Error {
    /// A `q=` token that does not follow the quality-value grammar.
    #[must_use]
    pub(crate) fn malformed_quality(token: impl Into<String>) -> Self {
        Self {
            kind: Kind::MalformedQuality(token.into()),
        }
    }

    /// An empty field (e.g. `gzip,,br`) in a comma-separated header.
    #[must_use]
    pub(crate) fn empty_field() -> Self {
        Self {
            kind: Kind::EmptyField,
        }
    }

    /// A parameter with a name other than `q` where only `q` is allowed.
    #[must_use]
    pub(crate) fn unsupported_parameter(name: impl Into<String>) -> Self {
        Self {
            kind: Kind::UnsupportedParameter(name.into()),
        }
    }

    /// A parameter without a `=` between name and value.
    #[must_use]
    pub(crate) fn malformed_parameter(param: impl Into<String>) -> Self {
        Self {
            kind: Kind::MalformedParameter(param.into()),
        }
    }

    /// A quoted parameter value that is never terminated.
    #[must_use]
    pub(crate) fn unclosed_quotes(segment: impl Into<String>) -> Self {
        Self {
            kind: Kind::UnclosedQuotes(segment.into()),
        }
    }

    /// A media range that does not follow the `type/subtype` grammar.
    #[must_use]
    pub(crate) fn malformed_media_range(segment: impl Into<String>) -> Self {
        Self {
            kind: Kind::MalformedMediaRange(segment.into()),
        }
    }

    /// A language tag whose shape the engine does not understand.
    ///
    /// Only surfaced by [`LanguageTag::from_str`]; the `Accept-Language`
    /// list parser drops such entries silently.
    ///
    /// [`LanguageTag::from_str`]: crate::LanguageTag
    #[must_use]
    pub(crate) fn malformed_language_tag(tag: impl Into<String>) -> Self {
        Self {
            kind: Kind::MalformedLanguageTag(tag.into()),
        }
    }

    /// A raw header value that is not valid visible ASCII.
    #[must_use]
    pub(crate) fn invalid_header_value() -> Self {
        Self {
            kind: Kind::InvalidHeaderValue,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.kind {
            Kind::MalformedQuality(token) => {
                write!(f, "malformed quality value: {token:?}")
            }
            Kind::EmptyField => f.write_str("Empty field in header"),
            Kind::UnsupportedParameter(name) => {
                write!(f, "Unsupported parameter: {name:?}")
            }
            Kind::MalformedParameter(param) => {
                write!(f, "malformed parameter: {param:?}")
            }
            Kind::UnclosedQuotes(segment) => {
                write!(f, "Unclosed quotes: {segment:?}")
            }
            Kind::MalformedMediaRange(segment) => {
                write!(f, "malformed media range: {segment:?}")
            }
            Kind::MalformedLanguageTag(tag) => {
                write!(f, "malformed language tag: {tag:?}")
            }
            Kind::InvalidHeaderValue => f.write_str("invalid header value"),
        }
    }
}

impl error::Error for Error {}
