use std::cmp::Ordering;

use http::HeaderMap;
use http::header::{self, HeaderName};

use crate::{
    Error, LanguageTag, MediaType, PreferenceKey, PreferenceSet, Quality, Variant, accept,
};

/// Server-driven content negotiation, defined in
/// [RFC7231](https://datatracker.ietf.org/doc/html/rfc7231#section-3.4.1):
/// the server computes the best representation of a resource from the
/// client's stated preferences, rather than returning a list for the client
/// to pick from.
///
/// A `Negotiation` accumulates the four `Accept*` request-header families
/// and then selects from a list of candidate [`Variant`]s. Build one per
/// request — populating it is O(header values) — and call [`select`] as
/// often as needed: selection is a pure function of the built state.
///
/// Each family setter replaces that family's state wholesale; passing no
/// values clears it ("no constraint"). Parse errors propagate immediately
/// and atomically — a malformed header never leaves a partially-applied
/// constraint behind.
///
/// [`select`]: Self::select
///
/// # Examples
///
/// ```
/// use conneg::{Negotiation, Variant};
///
/// let negotiation = Negotiation::new()
///     .with_accept(["text/html;q=0.9, application/json;q=0.5"])?
///     .with_accept_language(["en, fr;q=0.8"])?;
///
/// let variants = [
///     Variant::new().with_media_type(mime::APPLICATION_JSON),
///     Variant::new().with_media_type(mime::TEXT_HTML),
/// ];
/// assert_eq!(negotiation.select(&variants), Some(&variants[1]));
/// # Ok::<_, conneg::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Negotiation {
    media: Option<PreferenceSet<MediaType>>,
    charsets: Option<PreferenceSet<String>>,
    encodings: Option<PreferenceSet<String>>,
    languages: Option<PreferenceSet<LanguageTag>>,
    /// Weighting multiplier for media-range matching: one more than any
    /// requested parameter count can reach, so that a type or subtype match
    /// always outranks any number of matched parameters.
    media_radix: u64,
}

impl Negotiation {
    /// Create a negotiation with no constraints: every variant is
    /// acceptable at [`Quality::DEFAULT`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate all four families from a request's headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use conneg::{Negotiation, Variant};
    /// use http::{HeaderMap, header};
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert(header::ACCEPT, "application/json".parse().unwrap());
    ///
    /// let negotiation = Negotiation::from_headers(&headers).unwrap();
    /// let variants = [
    ///     Variant::new().with_media_type(mime::TEXT_HTML),
    ///     Variant::new().with_media_type(mime::APPLICATION_JSON),
    /// ];
    /// assert_eq!(negotiation.select(&variants), Some(&variants[1]));
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Error> {
        let mut negotiation = Self::new();
        negotiation
            .set_accept(collect_family(headers, &header::ACCEPT)?)?
            .set_accept_charset(collect_family(headers, &header::ACCEPT_CHARSET)?)?
            .set_accept_encoding(collect_family(headers, &header::ACCEPT_ENCODING)?)?
            .set_accept_language(collect_family(headers, &header::ACCEPT_LANGUAGE)?)?;
        Ok(negotiation)
    }

    /// Set the `Accept` constraint from raw header values.
    pub fn with_accept<I, S>(mut self, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_accept(values)?;
        Ok(self)
    }

    /// Set the `Accept` constraint from raw header values.
    pub fn set_accept<I, S>(&mut self, values: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let media = parse_family(values, accept::parse_media_preferences)?;
        self.media_radix = media.as_ref().map_or(1, media_radix);
        self.media = media;
        Ok(self)
    }

    /// Set the `Accept-Charset` constraint from raw header values.
    pub fn with_accept_charset<I, S>(mut self, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_accept_charset(values)?;
        Ok(self)
    }

    /// Set the `Accept-Charset` constraint from raw header values.
    pub fn set_accept_charset<I, S>(&mut self, values: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.charsets = parse_family(values, accept::parse_token_preferences)?;
        Ok(self)
    }

    /// Set the `Accept-Encoding` constraint from raw header values.
    pub fn with_accept_encoding<I, S>(mut self, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_accept_encoding(values)?;
        Ok(self)
    }

    /// Set the `Accept-Encoding` constraint from raw header values.
    pub fn set_accept_encoding<I, S>(&mut self, values: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.encodings = parse_family(values, accept::parse_token_preferences)?;
        Ok(self)
    }

    /// Set the `Accept-Language` constraint from raw header values.
    pub fn with_accept_language<I, S>(mut self, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_accept_language(values)?;
        Ok(self)
    }

    /// Set the `Accept-Language` constraint from raw header values.
    pub fn set_accept_language<I, S>(&mut self, values: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.languages = parse_family(values, accept::parse_language_preferences)?;
        Ok(self)
    }

    /// The parsed `Accept` preferences, if that header was present.
    #[must_use]
    pub fn media_preferences(&self) -> Option<&PreferenceSet<MediaType>> {
        self.media.as_ref()
    }

    /// The parsed `Accept-Charset` preferences, if that header was present.
    #[must_use]
    pub fn charset_preferences(&self) -> Option<&PreferenceSet<String>> {
        self.charsets.as_ref()
    }

    /// The parsed `Accept-Encoding` preferences, if that header was present.
    #[must_use]
    pub fn encoding_preferences(&self) -> Option<&PreferenceSet<String>> {
        self.encodings.as_ref()
    }

    /// The parsed `Accept-Language` preferences, if that header was present.
    #[must_use]
    pub fn language_preferences(&self) -> Option<&PreferenceSet<LanguageTag>> {
        self.languages.as_ref()
    }

    /// Select the best variant for the accumulated constraints.
    ///
    /// Candidates are evaluated in list order; a variant is rejected as soon
    /// as any dimension is unacceptable. Among the survivors the highest
    /// overall quality wins, with specificity and explicitness as
    /// tie-breaks — and on a full tie the earliest candidate stays, so the
    /// returned reference is stable over the input order.
    ///
    /// An empty list, or one where every candidate is rejected, yields
    /// `None`; that is a result, not an error.
    pub fn select<'a>(&self, variants: &'a [Variant]) -> Option<&'a Variant> {
        let mut best: Option<(&'a Variant, VariantQuality)> = None;
        for variant in variants {
            let Some(quality) = self.evaluate(variant) else {
                continue;
            };
            let preferred = match best.as_ref() {
                None => true,
                Some((best_variant, best_quality)) => {
                    preferred_over(variant, &quality, best_variant, best_quality)
                }
            };
            if preferred {
                best = Some((variant, quality));
            }
        }
        match best {
            Some((variant, quality)) => {
                tracing::trace!(overall = quality.overall(), "selected variant {variant:?}");
                Some(variant)
            }
            None => {
                tracing::trace!("no acceptable variant");
                None
            }
        }
    }

    /// The per-dimension qualities of one candidate, or `None` if any
    /// dimension rejects it.
    fn evaluate(&self, variant: &Variant) -> Option<VariantQuality> {
        let mut quality = VariantQuality::default();

        // media type
        if let (Some(preferences), Some(declared)) = (self.media.as_ref(), variant.media_type()) {
            let mut best: Option<(u64, Quality, &MediaType)> = None;
            for (key, entry_quality) in preferences.iter() {
                let Some(requested) = key.as_specific() else {
                    continue;
                };
                let Some(score) = self.match_media(requested, declared) else {
                    continue;
                };
                let replace = match best {
                    None => true,
                    Some((best_score, best_quality, _)) => {
                        score > best_score || (score == best_score && entry_quality > best_quality)
                    }
                };
                if replace {
                    best = Some((score, entry_quality, requested));
                }
            }
            let (_, matched, requested) = best?;
            if !matched.is_acceptable() {
                return None;
            }
            quality.media = matched;
            quality.requested_media = Some(requested.clone());
        }

        // charset, only constrained when the variant's media type names one
        if let Some(charsets) = self.charsets.as_ref() {
            if let Some(charset) = variant.media_type().and_then(MediaType::charset) {
                let matched = charsets.best_match(&charset.to_owned())?;
                if !matched.is_acceptable() {
                    return None;
                }
                quality.charset = matched;
            }
        }

        // encoding
        if let Some(encodings) = self.encodings.as_ref() {
            if let Some(encoding) = variant.encoding() {
                let matched = encodings.best_match(&encoding.to_owned())?;
                if !matched.is_acceptable() {
                    return None;
                }
                quality.encoding = matched;
            }
        }

        // language
        if let Some(languages) = self.languages.as_ref() {
            if let Some(language) = variant.language() {
                let matched = languages.best_match(language)?;
                if !matched.is_acceptable() {
                    return None;
                }
                quality.language = matched;
            }
        }

        Some(quality)
    }

    /// How well `requested` covers the `declared` media type of a variant,
    /// `None` when it does not cover it at all.
    ///
    /// Type and subtype matches are weighted by the radix so that they
    /// always outrank any number of matched parameters.
    fn match_media(&self, requested: &MediaType, declared: &MediaType) -> Option<u64> {
        let mut score = 0u64;
        if requested.type_() == declared.type_() {
            score += 100 * self.media_radix;
        } else if !requested.is_wildcard_type() && !declared.is_wildcard_type() {
            return None;
        }
        if requested.subtype() == declared.subtype() {
            score += 10 * self.media_radix;
        } else if !requested.is_wildcard_subtype() && !declared.is_wildcard_subtype() {
            return None;
        }
        for (name, value) in requested.parameters() {
            match declared.parameter(name) {
                Some(declared_value) if declared_value == value => {}
                _ if name == "charset" => {
                    // the variant does not pin this charset itself; the
                    // requested one may still be served unless the
                    // accept-charset constraint rules it out
                    if let Some(charsets) = self.charsets.as_ref() {
                        if charsets
                            .get(&PreferenceKey::Specific(value.clone()))
                            .is_none()
                            && charsets.get_any().is_none()
                        {
                            return None;
                        }
                    }
                }
                _ => return None,
            }
        }
        Some(score + requested.parameters().len() as u64)
    }
}

/// The four dimension qualities of one candidate variant, plus the
/// requested media range it matched; lives only for the duration of one
/// [`Negotiation::select`] call.
#[derive(Debug, Clone, Default)]
struct VariantQuality {
    media: Quality,
    charset: Quality,
    encoding: Quality,
    language: Quality,
    requested_media: Option<MediaType>,
}

impl VariantQuality {
    /// The overall quality: the product of the four dimension weights,
    /// rounded half-up to five decimal digits (`0..=100_000`).
    ///
    /// Computed entirely on scaled integers so that equal inputs always
    /// produce bit-identical scores.
    fn overall(&self) -> u64 {
        let product = u64::from(self.media.as_millis())
            * u64::from(self.charset.as_millis())
            * u64::from(self.encoding.as_millis())
            * u64::from(self.language.as_millis());
        (product + 5_000_000) / 10_000_000
    }
}

/// Whether `candidate` should replace `current` as the best variant so far.
/// Strict: a candidate that ties on every rule does not replace.
fn preferred_over(
    candidate: &Variant,
    candidate_quality: &VariantQuality,
    current: &Variant,
    current_quality: &VariantQuality,
) -> bool {
    match candidate_quality.overall().cmp(&current_quality.overall()) {
        Ordering::Greater => return true,
        Ordering::Less => return false,
        Ordering::Equal => {}
    }

    // both matched a requested media range: the more specific request wins
    if let (Some(candidate_requested), Some(current_requested)) = (
        candidate_quality.requested_media.as_ref(),
        current_quality.requested_media.as_ref(),
    ) {
        match candidate_requested
            .wildcard_count()
            .cmp(&current_requested.wildcard_count())
        {
            Ordering::Less => return true,
            Ordering::Greater => return false,
            Ordering::Equal => {}
        }
        match candidate_requested
            .parameters()
            .len()
            .cmp(&current_requested.parameters().len())
        {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }

    // the more specific declared media type wins
    let (candidate_wildcards, candidate_parameters) = declared_media_rank(candidate);
    let (current_wildcards, current_parameters) = declared_media_rank(current);
    match candidate_wildcards.cmp(&current_wildcards) {
        Ordering::Less => return true,
        Ordering::Greater => return false,
        Ordering::Equal => {}
    }
    match candidate_parameters.cmp(&current_parameters) {
        Ordering::Greater => return true,
        Ordering::Less => return false,
        Ordering::Equal => {}
    }

    // the variant declaring more dimensions wins; a full tie keeps the
    // earlier variant
    candidate.explicitness() > current.explicitness()
}

/// Specificity rank of a variant's own media type: fewer wildcards first,
/// then more parameters. A variant without one ranks below every declared
/// media type.
fn declared_media_rank(variant: &Variant) -> (u8, usize) {
    variant.media_type().map_or((3, 0), |media| {
        (media.wildcard_count(), media.parameters().len())
    })
}

/// One more than any requested parameter count can reach.
fn media_radix(preferences: &PreferenceSet<MediaType>) -> u64 {
    preferences
        .iter()
        .filter_map(|(key, _)| key.as_specific())
        .map(|media| media.parameters().len() as u64)
        .max()
        .map_or(1, |most| most.max(1))
}

/// Parse and merge one header family's raw values, in order. All-blank
/// input (or none at all) leaves the family unconstrained.
fn parse_family<K, I, S, P>(values: I, parse: P) -> Result<Option<PreferenceSet<K>>, Error>
where
    K: Eq + std::hash::Hash,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    P: Fn(&str) -> Result<Option<PreferenceSet<K>>, Error>,
{
    let mut merged: Option<PreferenceSet<K>> = None;
    for value in values {
        if let Some(parsed) = parse(value.as_ref())? {
            let target = merged.get_or_insert_with(PreferenceSet::new);
            for (key, quality) in parsed.into_entries() {
                target.insert(key, quality);
            }
        }
    }
    Ok(merged)
}

fn collect_family<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Result<Vec<&'a str>, Error> {
    headers
        .get_all(name)
        .iter()
        .map(|value| {
            value.to_str().map_err(|err| {
                tracing::debug!("non-ascii {name} header value: {err}");
                Error::invalid_header_value()
            })
        })
        .collect()
}
