use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::{Error, accept};

/// A media type (or media range) such as `text/html` or
/// `application/xml;charset=utf-8`, defined in
/// [RFC7231](https://datatracker.ietf.org/doc/html/rfc7231#section-3.1.1.1).
///
/// Either half may be the `*` wildcard when used as a range in `Accept`.
/// The type, subtype and parameter names are normalized to lowercase;
/// parameter values are kept verbatim. Two media types are equal when type,
/// subtype and the full *set* of parameters agree — parameter order does not
/// matter, but a media type with different parameters is a different value
/// (and a different preference-map key).
///
/// # Examples
///
/// ```
/// use conneg::MediaType;
///
/// let media: MediaType = "Text/HTML;Level=1".parse().unwrap();
/// assert_eq!(media.type_(), "text");
/// assert_eq!(media.subtype(), "html");
/// assert_eq!(media.parameter("level"), Some("1"));
///
/// let other = MediaType::new("text", "html").with_parameter("level", "1");
/// assert_eq!(media, other);
///
/// let from_mime: MediaType = mime::TEXT_PLAIN_UTF_8.into();
/// assert_eq!(from_mime.parameter("charset"), Some("utf-8"));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaType {
    type_: String,
    subtype: String,
    parameters: IndexMap<String, String>,
}

impl MediaType {
    /// Create a media type without parameters.
    #[must_use]
    pub fn new(type_: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            type_: type_.into().to_lowercase(),
            subtype: subtype.into().to_lowercase(),
            parameters: IndexMap::new(),
        }
    }

    /// The full wildcard range, `*/*`.
    #[must_use]
    pub fn star() -> Self {
        Self::new("*", "*")
    }

    /// Attach a parameter to this media type.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_parameter(name, value);
        self
    }

    /// Attach a parameter to this media type.
    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters
            .insert(name.into().to_lowercase(), value.into());
    }

    /// The top-level type, lowercase (possibly `*`).
    #[must_use]
    pub fn type_(&self) -> &str {
        &self.type_
    }

    /// The subtype, lowercase (possibly `*`).
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// The parameters, in insertion order.
    #[must_use]
    pub fn parameters(&self) -> &IndexMap<String, String> {
        &self.parameters
    }

    /// The value of the parameter with this (case-insensitive) name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// The value of the `charset` parameter, if any.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Whether the top-level type is the `*` wildcard.
    #[must_use]
    pub fn is_wildcard_type(&self) -> bool {
        self.type_ == "*"
    }

    /// Whether the subtype is the `*` wildcard.
    #[must_use]
    pub fn is_wildcard_subtype(&self) -> bool {
        self.subtype == "*"
    }

    /// How many wildcard halves this media type carries; fewer is more
    /// specific.
    pub(crate) fn wildcard_count(&self) -> u8 {
        u8::from(self.is_wildcard_type()) + u8::from(self.is_wildcard_subtype())
    }
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.type_ == other.type_
            && self.subtype == other.subtype
            // IndexMap equality is order-independent
            && self.parameters == other.parameters
    }
}

impl Eq for MediaType {}

impl Hash for MediaType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_.hash(state);
        self.subtype.hash(state);
        // parameter order must not influence the hash, to stay consistent
        // with the order-independent equality above
        let mut parameters: u64 = 0;
        for pair in &self.parameters {
            let mut hasher = DefaultHasher::new();
            pair.hash(&mut hasher);
            parameters = parameters.wrapping_add(hasher.finish());
        }
        state.write_u64(parameters);
    }
}

impl FromStr for MediaType {
    type Err = Error;

    /// Parse a single media type.
    ///
    /// Parameter values may be quoted strings with backslash escapes.
    /// Unlike in an `Accept` header, `q` has no special meaning here and is
    /// kept as an ordinary parameter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        accept::parse_single_media_type(s)
    }
}

impl From<mime::Mime> for MediaType {
    fn from(mime: mime::Mime) -> Self {
        // a Mime is already a validated media type, so the scanner accepts
        // its canonical form; the fallback only drops parameters
        match accept::parse_single_media_type(mime.as_ref()) {
            Ok(media) => media,
            Err(_) => Self::new(mime.type_().as_str(), mime.subtype().as_str()),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.parameters {
            if is_token(value) {
                write!(f, ";{name}={value}")?;
            } else {
                write!(f, ";{name}=\"")?;
                for c in value.chars() {
                    if matches!(c, '"' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")?;
            }
        }
        Ok(())
    }
}

/// Whether `value` is a non-empty HTTP token, i.e. can go on the wire
/// without quoting.
fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            matches!(b,
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' |
                b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' |
                b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
        })
}
