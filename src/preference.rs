use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::Quality;

/// A requested key in a weighted preference set:
/// either a specific value or the `*` wildcard.
///
/// The wildcard is an explicit variant rather than a sentinel key so that
/// "match anything" can never be confused with an actual requested value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreferenceKey<K> {
    /// A specific requested value.
    Specific(K),
    /// The `*` wildcard, matching any candidate value.
    Any,
}

impl<K> PreferenceKey<K> {
    /// The specific requested value, if this key is not the wildcard.
    #[must_use]
    pub fn as_specific(&self) -> Option<&K> {
        match self {
            Self::Specific(key) => Some(key),
            Self::Any => None,
        }
    }

    /// Whether this key is the `*` wildcard.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

/// How specifically a requested key matches a candidate value.
///
/// Family-specific wildcard/match rules live on the key type; the
/// preference set invokes them uniformly. Higher levels are more specific;
/// the wildcard entry sits below every specific match at level zero.
pub(crate) trait MatchKey {
    /// The specificity of the match, `None` when `self` does not cover
    /// `candidate` at all.
    fn match_candidate(&self, candidate: &Self) -> Option<u8>;
}

impl MatchKey for String {
    fn match_candidate(&self, candidate: &Self) -> Option<u8> {
        (self == candidate).then_some(1)
    }
}

/// An ordered mapping from requested keys to [`Quality`] weights,
/// one per header family of a negotiation.
///
/// Iteration order is the order of first occurrence in the header; inserting
/// a key again overwrites its quality without moving it. A family whose
/// header was not present has no set at all ("no constraint") — an *empty*
/// set is a constraint nothing satisfies.
#[derive(Debug, Clone)]
pub struct PreferenceSet<K> {
    entries: IndexMap<PreferenceKey<K>, Quality>,
}

impl<K: Eq + Hash> PartialEq for PreferenceSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq + Hash> PreferenceSet<K> {
    /// Create an empty preference set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// The number of entries in this set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this set has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a requested key with its weight.
    ///
    /// A key inserted twice keeps its original position and takes the
    /// latest weight.
    pub fn insert(&mut self, key: PreferenceKey<K>, quality: Quality) {
        self.entries.insert(key, quality);
    }

    /// The weight stored for exactly this key, without any wildcard fallback.
    #[must_use]
    pub fn get(&self, key: &PreferenceKey<K>) -> Option<Quality> {
        self.entries.get(key).copied()
    }

    /// The weight of the `*` entry, if the header carried one.
    #[must_use]
    pub fn get_any(&self) -> Option<Quality> {
        self.get(&PreferenceKey::Any)
    }

    /// Iterate the entries in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&PreferenceKey<K>, Quality)> {
        self.entries.iter().map(|(key, quality)| (key, *quality))
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (PreferenceKey<K>, Quality)> {
        self.entries.into_iter()
    }

    /// The weight of the most specific entry covering `candidate`.
    ///
    /// Specific entries are consulted through [`MatchKey`]; the wildcard
    /// entry applies only when no specific entry matched. Entries tied on
    /// specificity keep the earlier one — header order is the client's
    /// preference order.
    pub(crate) fn best_match(&self, candidate: &K) -> Option<Quality>
    where
        K: MatchKey,
    {
        let mut best: Option<(u8, Quality)> = None;
        for (key, quality) in self.iter() {
            let level = match key {
                PreferenceKey::Any => 0,
                PreferenceKey::Specific(requested) => match requested.match_candidate(candidate) {
                    Some(level) => level,
                    None => continue,
                },
            };
            if best.is_none_or(|(current, _)| level > current) {
                best = Some((level, quality));
            }
        }
        best.map(|(_, quality)| quality)
    }
}

impl<K: Eq + Hash> Default for PreferenceSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Display> fmt::Display for PreferenceSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, quality) in &self.entries {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match key {
                PreferenceKey::Specific(key) => fmt::Display::fmt(key, f)?,
                PreferenceKey::Any => f.write_str("*")?,
            }
            if *quality != Quality::DEFAULT {
                write!(f, ";q={quality}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(&str, u16)]) -> PreferenceSet<String> {
        let mut set = PreferenceSet::new();
        for (token, millis) in entries {
            let key = if *token == "*" {
                PreferenceKey::Any
            } else {
                PreferenceKey::Specific((*token).to_owned())
            };
            set.insert(key, Quality::from_millis(*millis).unwrap());
        }
        set
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let set = set(&[("gzip", 500), ("br", 800), ("gzip", 100)]);
        assert_eq!(set.len(), 2);
        let entries: Vec<_> = set.iter().collect();
        assert_eq!(
            entries[0],
            (
                &PreferenceKey::Specific("gzip".to_owned()),
                Quality::from_millis(100).unwrap(),
            ),
        );
        assert!(entries[1].0.as_specific().is_some_and(|t| t == "br"));
    }

    #[test]
    fn test_best_match_prefers_specific_over_wildcard() {
        let set = set(&[("*", 100), ("gzip", 500)]);
        assert_eq!(
            set.best_match(&"gzip".to_owned()),
            Quality::from_millis(500),
        );
        assert_eq!(
            set.best_match(&"deflate".to_owned()),
            Quality::from_millis(100),
        );
    }

    #[test]
    fn test_best_match_without_wildcard() {
        let set = set(&[("gzip", 500)]);
        assert_eq!(set.best_match(&"deflate".to_owned()), None);
        assert_eq!(set.best_match(&"identity".to_owned()), None);
    }

    #[test]
    fn test_wildcard_quality_zero_is_still_an_entry() {
        let set = set(&[("*", 0)]);
        assert_eq!(
            set.best_match(&"anything".to_owned()),
            Some(Quality::NOT_ACCEPTABLE),
        );
    }

    #[test]
    fn test_display_omits_default_quality() {
        let set = set(&[("gzip", 1000), ("br", 500), ("*", 1)]);
        assert_eq!(set.to_string(), "gzip, br;q=0.500, *;q=0.001");
    }
}
