use std::fmt;
use std::str::FromStr;

use crate::Error;
use crate::preference::MatchKey;

/// A language tag as carried by `Accept-Language` and declared on variants:
/// a primary language with an optional region, e.g. `en` or `en-US`.
///
/// The primary tag is normalized to lowercase and the region to uppercase,
/// so `en-us`, `EN-US` and `en-US` are the same tag.
///
/// # Examples
///
/// ```
/// use conneg::LanguageTag;
///
/// let tag: LanguageTag = "en-us".parse().unwrap();
/// assert_eq!(tag.primary(), "en");
/// assert_eq!(tag.region(), Some("US"));
/// assert_eq!(tag.to_string(), "en-US");
///
/// assert!("english".parse::<LanguageTag>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LanguageTag {
    primary: String,
    region: Option<String>,
}

impl LanguageTag {
    /// Create a tag with only a primary language.
    #[must_use]
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into().to_lowercase(),
            region: None,
        }
    }

    /// Attach a region to this tag.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.set_region(region);
        self
    }

    /// Attach a region to this tag.
    pub fn set_region(&mut self, region: impl Into<String>) {
        self.region = Some(region.into().to_uppercase());
    }

    /// The primary language, lowercase.
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// The region, uppercase, if any.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl FromStr for LanguageTag {
    type Err = Error;

    /// Parse a header token into a language tag.
    ///
    /// Only the two shapes the negotiation engine understands are accepted:
    /// a two-character primary tag (`en`), or primary plus region separated
    /// by a dash (`en-US`). Anything else is an error; the `Accept-Language`
    /// *list* parser drops such entries instead of failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        match bytes.len() {
            2 => Ok(Self::new(s)),
            5 if bytes[2] == b'-' => Ok(Self::new(&s[..2]).with_region(&s[3..])),
            _ => Err(Error::malformed_language_tag(s)),
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary)?;
        if let Some(region) = &self.region {
            write!(f, "-{region}")?;
        }
        Ok(())
    }
}

impl MatchKey for LanguageTag {
    /// Language matching is by decreasing specificity: an exact match on
    /// primary and region (including both absent) wins outright; a requested
    /// tag without a region covers every regional variant of that language;
    /// a requested tag *with* a region only tentatively covers a variant
    /// that declares none.
    fn match_candidate(&self, candidate: &Self) -> Option<u8> {
        if self.primary != candidate.primary {
            return None;
        }
        match (self.region.as_deref(), candidate.region.as_deref()) {
            (requested, declared) if requested == declared => Some(3),
            (None, Some(_)) => Some(2),
            (Some(_), None) => Some(1),
            _ => None,
        }
    }
}
