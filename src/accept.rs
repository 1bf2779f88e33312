//! Parsers for the `Accept*` request-header families.
//!
//! Each entry point turns one raw header value into an ordered
//! [`PreferenceSet`], mapping requested values to [`Quality`] weights.
//! A `None` result means the value was blank: the header is absent and that
//! dimension is unconstrained. That is *not* the same as a present header
//! that yields an empty set (e.g. `Accept-Encoding: ,`), which is a
//! constraint nothing satisfies.
//!
//! Parsing is strict: a single malformed segment fails the whole value with
//! a descriptive [`Error`], it never degrades into a partial result. The two
//! deliberate exceptions, kept for compatibility with the behavior clients
//! have come to rely on:
//!
//! - `Accept-Language` entries whose tag shape is not understood are dropped
//!   silently rather than rejected;
//! - parameters after `q` in an `Accept` media range (RFC accept-extensions)
//!   are not supported: they force the range's weight to
//!   [`Quality::NOT_ACCEPTABLE`] and are dropped, rather than erroring.
//!
//! # ABNF
//!
//! ```text
//! Accept          = #( media-range [ weight ] )
//! Accept-Charset  = 1#( ( charset / "*" ) [ weight ] )
//! Accept-Encoding = #( codings [ weight ] )
//! Accept-Language = 1#( language-range [ weight ] )
//!
//! media-range = ( "*/*" / ( type "/" "*" ) / ( type "/" subtype ) )
//!               *( OWS ";" OWS parameter )
//! parameter   = token "=" ( token / quoted-string )
//! ```

use crate::{Error, LanguageTag, MediaType, PreferenceKey, PreferenceSet, Quality};

/// Parse a token-valued preference list, as carried by `Accept-Charset`
/// and `Accept-Encoding`.
///
/// Tokens keep the order of their first occurrence; a repeated token
/// overwrites the earlier weight in place. The `*` token becomes
/// [`PreferenceKey::Any`].
///
/// # Examples
///
/// ```
/// use conneg::accept::parse_token_preferences;
///
/// let set = parse_token_preferences("gzip;q=0.8, br, *;q=0.1")
///     .unwrap()
///     .unwrap();
/// assert_eq!(set.len(), 3);
/// assert!(set.get_any().is_some());
///
/// assert!(parse_token_preferences("  ").unwrap().is_none());
/// assert!(parse_token_preferences("gzip;level=9").is_err());
/// ```
pub fn parse_token_preferences(value: &str) -> Result<Option<PreferenceSet<String>>, Error> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    let mut segments: Vec<&str> = value.split(',').collect();
    // trailing commas do not produce empty fields
    while segments.last().is_some_and(|segment| segment.is_empty()) {
        segments.pop();
    }
    let mut set = PreferenceSet::new();
    for segment in segments {
        let (token, quality) = match segment.split_once(';') {
            None => (segment.trim(), Quality::DEFAULT),
            Some((token, parameter)) => (token.trim(), parse_q_parameter(parameter)?),
        };
        if token.is_empty() {
            return Err(Error::empty_field());
        }
        let key = if token == "*" {
            PreferenceKey::Any
        } else {
            PreferenceKey::Specific(token.to_owned())
        };
        set.insert(key, quality);
    }
    Ok(Some(set))
}

/// Parse an `Accept-Language` preference list.
///
/// Delegates to [`parse_token_preferences`] and then maps every token
/// through [`LanguageTag`]. Tokens whose shape is not understood are
/// dropped, not rejected — but a malformed field or weight still fails the
/// whole value.
///
/// # Examples
///
/// ```
/// use conneg::accept::parse_language_preferences;
///
/// let set = parse_language_preferences("en-US, en;q=0.5, klingon;q=0.8")
///     .unwrap()
///     .unwrap();
/// // `klingon` is not a tag shape this engine understands: dropped
/// assert_eq!(set.len(), 2);
/// ```
pub fn parse_language_preferences(value: &str) -> Result<Option<PreferenceSet<LanguageTag>>, Error> {
    let Some(tokens) = parse_token_preferences(value)? else {
        return Ok(None);
    };
    let mut set = PreferenceSet::new();
    for (key, quality) in tokens.iter() {
        match key {
            PreferenceKey::Any => set.insert(PreferenceKey::Any, quality),
            PreferenceKey::Specific(token) => match token.parse::<LanguageTag>() {
                Ok(tag) => set.insert(PreferenceKey::Specific(tag), quality),
                Err(_) => {
                    tracing::debug!("ignoring malformed language tag in accept-language: {token:?}");
                }
            },
        }
    }
    Ok(Some(set))
}

/// Parse an `Accept` media-range preference list.
///
/// This is a hand-written scanner rather than a comma split: parameter
/// values may be quoted strings that contain commas and escaped quotes.
/// Every range is keyed by its full [`MediaType`] — the same type/subtype
/// with different parameters is a different key. A parameter literally
/// named `q` carries the range's weight and must come last; see the module
/// docs for how parameters after it are treated.
///
/// # Examples
///
/// ```
/// use conneg::accept::parse_media_preferences;
/// use conneg::{MediaType, PreferenceKey, Quality};
///
/// let set = parse_media_preferences("text/html, text/*;q=0.5").unwrap().unwrap();
/// assert_eq!(
///     set.get(&PreferenceKey::Specific(MediaType::new("text", "html"))),
///     Some(Quality::DEFAULT),
/// );
///
/// assert!(parse_media_preferences("text/html;foo=\"bar").is_err());
/// ```
pub fn parse_media_preferences(value: &str) -> Result<Option<PreferenceSet<MediaType>>, Error> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    // trailing commas do not produce empty fields; commas inside quoted
    // strings always have a closing quote behind them, so this is safe
    let mut value = value;
    while let Some(stripped) = value.strip_suffix(',') {
        value = stripped;
    }
    let mut set = PreferenceSet::new();
    let mut scanner = Scanner::new(value);
    while !scanner.rest().is_empty() {
        let (media, quality) = scan_media_range(&mut scanner, true)?;
        set.insert(PreferenceKey::Specific(media), quality);
    }
    Ok(Some(set))
}

/// Parse exactly one media type, `q` treated as an ordinary parameter.
pub(crate) fn parse_single_media_type(value: &str) -> Result<MediaType, Error> {
    if value.trim().is_empty() {
        return Err(Error::empty_field());
    }
    let mut scanner = Scanner::new(value);
    let (media, _) = scan_media_range(&mut scanner, false)?;
    scanner.skip_whitespace();
    if !scanner.rest().is_empty() {
        return Err(Error::malformed_media_range(value));
    }
    Ok(media)
}

/// The parameter part of a token segment: must be exactly `q=<quality>`.
fn parse_q_parameter(parameter: &str) -> Result<Quality, Error> {
    let parameter = parameter.trim();
    let Some((name, value)) = parameter.split_once('=') else {
        return Err(Error::malformed_parameter(parameter));
    };
    let name = name.trim();
    if name != "q" {
        return Err(Error::unsupported_parameter(name));
    }
    value.trim().parse()
}

// ===== the media-range scanner =====

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume `expected` if it is next.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Consume up to (not including) the first char `stop` accepts.
    fn take_until(&mut self, stop: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stop(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }
}

/// Scan one media range, consuming its trailing `,` if present.
///
/// With `q_is_weight` the `q` parameter is pulled out as the range's
/// quality (the `Accept` context); without it `q` stays an ordinary
/// parameter (parsing a standalone media type).
fn scan_media_range(scanner: &mut Scanner<'_>, q_is_weight: bool) -> Result<(MediaType, Quality), Error> {
    scanner.skip_whitespace();
    let type_ = scanner
        .take_until(|c| matches!(c, '/' | ';' | ','))
        .trim_end();
    if !scanner.eat('/') {
        return Err(if type_.is_empty() {
            Error::empty_field()
        } else {
            Error::malformed_media_range(type_)
        });
    }
    if type_.is_empty() {
        return Err(Error::empty_field());
    }
    let subtype = scanner.take_until(|c| matches!(c, ';' | ',')).trim();
    if subtype.is_empty() {
        return Err(Error::malformed_media_range(format!("{type_}/")));
    }
    let mut media = MediaType::new(type_, subtype);
    let mut quality = Quality::DEFAULT;
    if scanner.eat(';') {
        quality = scan_parameters(scanner, &mut media, q_is_weight)?;
    } else {
        scanner.eat(',');
    }
    Ok((media, quality))
}

/// Scan a `;`-separated parameter block, consuming the item's trailing `,`
/// if present, and return the item's weight.
fn scan_parameters(
    scanner: &mut Scanner<'_>,
    media: &mut MediaType,
    q_is_weight: bool,
) -> Result<Quality, Error> {
    loop {
        scanner.skip_whitespace();
        let name = scanner
            .take_until(|c| matches!(c, '=' | ';' | ','))
            .trim_end();
        if name.is_empty() || !scanner.eat('=') {
            return Err(Error::malformed_parameter(name));
        }
        scanner.skip_whitespace();
        let value = if scanner.peek() == Some('"') {
            let value = scan_quoted_value(scanner)?;
            scanner.skip_whitespace();
            value
        } else {
            scanner
                .take_until(|c| matches!(c, ';' | ','))
                .trim_end()
                .to_owned()
        };
        // only a delimiter (or the end) may follow a value
        match scanner.peek() {
            None | Some(';') | Some(',') => {}
            Some(_) => return Err(Error::malformed_parameter(name)),
        }
        if q_is_weight && name == "q" {
            let quality = value.parse::<Quality>()?;
            if scanner.eat(';') {
                // accept-extensions are not supported: zero the weight and
                // drop the rest of the item instead of failing
                tracing::debug!(
                    "unsupported accept-extension after q in media range {media}; \
                     marking not acceptable"
                );
                skip_dropped_parameters(scanner);
                return Ok(Quality::NOT_ACCEPTABLE);
            }
            scanner.eat(',');
            return Ok(quality);
        }
        media.set_parameter(name, value);
        if scanner.eat(';') {
            continue;
        }
        scanner.eat(',');
        return Ok(Quality::DEFAULT);
    }
}

/// Scan a double-quoted value, unescaping `\"`-style escapes.
fn scan_quoted_value(scanner: &mut Scanner<'_>) -> Result<String, Error> {
    let opening = scanner.rest();
    scanner.eat('"');
    let mut value = String::new();
    loop {
        match scanner.bump() {
            Some('"') => return Ok(value),
            Some('\\') => match scanner.bump() {
                Some(escaped) => value.push(escaped),
                None => return Err(Error::unclosed_quotes(opening)),
            },
            Some(c) => value.push(c),
            None => return Err(Error::unclosed_quotes(opening)),
        }
    }
}

/// Skip the remainder of an item after an unsupported accept-extension,
/// through its trailing `,`. Quoted values are skipped as a unit; nothing
/// here is validated.
fn skip_dropped_parameters(scanner: &mut Scanner<'_>) {
    while let Some(c) = scanner.bump() {
        match c {
            ',' => return,
            '"' => {
                while let Some(c) = scanner.bump() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if scanner.bump().is_none() {
                                return;
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn tokens(value: &str) -> PreferenceSet<String> {
        parse_token_preferences(value).unwrap().unwrap()
    }

    fn media(value: &str) -> PreferenceSet<MediaType> {
        parse_media_preferences(value).unwrap().unwrap()
    }

    fn token_key(token: &str) -> PreferenceKey<String> {
        PreferenceKey::Specific(token.to_owned())
    }

    fn q(millis: u16) -> Quality {
        Quality::from_millis(millis).unwrap()
    }

    // ===== token lists =====

    #[test]
    fn test_tokens_basic() {
        let set = tokens("gzip;q=0.8, br, *;q=0.1");
        let entries: Vec<_> = set.iter().collect();
        assert_eq!(
            entries,
            vec![
                (&token_key("gzip"), q(800)),
                (&token_key("br"), q(1000)),
                (&PreferenceKey::Any, q(100)),
            ],
        );
    }

    #[test]
    fn test_tokens_blank_means_absent() {
        assert!(parse_token_preferences("").unwrap().is_none());
        assert!(parse_token_preferences("   \t ").unwrap().is_none());
    }

    #[test]
    fn test_tokens_trailing_commas_ignored() {
        assert_eq!(tokens("gzip,").len(), 1);
        assert_eq!(tokens("gzip,,,").len(), 1);
        // only a truly empty trailing segment is ignored
        assert!(parse_token_preferences("gzip, ").is_err());
        // a bare comma leaves a present-but-empty constraint
        assert!(tokens(",").is_empty());
    }

    #[test]
    fn test_tokens_duplicate_overwrites_in_place() {
        let set = tokens("gzip;q=0.5, br, gzip;q=0.9");
        let entries: Vec<_> = set.iter().collect();
        assert_eq!(entries[0], (&token_key("gzip"), q(900)));
        assert_eq!(entries[1], (&token_key("br"), q(1000)));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_tokens_errors() {
        for invalid in [
            "gzip,,br",      // empty field
            ",gzip",         // empty field
            "gzip;level=9",  // unsupported parameter
            "gzip;q",        // missing =
            "gzip;q=2",      // malformed quality
            "gzip;q=0.5000", // malformed quality
            ";q=0.5",        // empty token
        ] {
            assert!(parse_token_preferences(invalid).is_err(), "{invalid:?}");
        }
    }

    #[test]
    fn test_tokens_error_messages() {
        assert_eq!(
            parse_token_preferences("gzip,,br").unwrap_err().to_string(),
            "Empty field in header",
        );
        assert_eq!(
            parse_token_preferences("gzip;level=9")
                .unwrap_err()
                .to_string(),
            "Unsupported parameter: \"level\"",
        );
    }

    #[quickcheck]
    fn prop_token_display_round_trips(entries: Vec<(u8, u16)>) -> bool {
        const TOKENS: [&str; 6] = ["gzip", "br", "deflate", "zstd", "identity", "*"];
        if entries.is_empty() {
            return true;
        }
        let mut set = PreferenceSet::new();
        for (index, millis) in entries {
            let token = TOKENS[usize::from(index) % TOKENS.len()];
            let key = if token == "*" {
                PreferenceKey::Any
            } else {
                PreferenceKey::Specific(token.to_owned())
            };
            set.insert(key, q(millis % 1001));
        }
        parse_token_preferences(&set.to_string()).unwrap().unwrap() == set
    }

    // ===== language lists =====

    #[test]
    fn test_languages_basic() {
        let set = parse_language_preferences("en-US, en;q=0.5, *;q=0.1")
            .unwrap()
            .unwrap();
        let en_us = PreferenceKey::Specific(LanguageTag::new("en").with_region("US"));
        assert_eq!(set.get(&en_us), Some(q(1000)));
        assert_eq!(
            set.get(&PreferenceKey::Specific(LanguageTag::new("en"))),
            Some(q(500)),
        );
        assert_eq!(set.get_any(), Some(q(100)));
    }

    #[test]
    fn test_languages_malformed_tags_dropped_silently() {
        let set = parse_language_preferences("en, klingon, x, en-USA;q=0.5")
            .unwrap()
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(&PreferenceKey::Specific(LanguageTag::new("en"))),
            Some(q(1000)),
        );
    }

    #[test]
    fn test_languages_field_errors_still_propagate() {
        assert!(parse_language_preferences("en;level=1").is_err());
        assert!(parse_language_preferences("en;q=1.5").is_err());
        assert!(parse_language_preferences("en,,fr").is_err());
    }

    // ===== media-range lists =====

    #[test]
    fn test_media_basic() {
        let set = media("text/html;q=0.9, text/plain;q=0.5, */*;q=0.1");
        let entries: Vec<_> = set.iter().collect();
        assert_eq!(
            entries,
            vec![
                (
                    &PreferenceKey::Specific(MediaType::new("text", "html")),
                    q(900),
                ),
                (
                    &PreferenceKey::Specific(MediaType::new("text", "plain")),
                    q(500),
                ),
                (&PreferenceKey::Specific(MediaType::star()), q(100)),
            ],
        );
    }

    #[test]
    fn test_media_blank_means_absent() {
        assert!(parse_media_preferences("").unwrap().is_none());
        assert!(parse_media_preferences(" \t").unwrap().is_none());
    }

    #[test]
    fn test_media_parameters_are_part_of_the_key() {
        let set = media("text/html;level=1;q=0.7, text/html;q=0.4");
        assert_eq!(set.len(), 2);
        let leveled = MediaType::new("text", "html").with_parameter("level", "1");
        assert_eq!(set.get(&PreferenceKey::Specific(leveled)), Some(q(700)));
        assert_eq!(
            set.get(&PreferenceKey::Specific(MediaType::new("text", "html"))),
            Some(q(400)),
        );
    }

    #[test]
    fn test_media_quoted_values_may_contain_commas_and_semicolons() {
        let set = media("application/xml;note=\"a, b; c\", text/plain");
        assert_eq!(set.len(), 2);
        let xml = MediaType::new("application", "xml").with_parameter("note", "a, b; c");
        assert_eq!(set.get(&PreferenceKey::Specific(xml)), Some(q(1000)));
    }

    #[test]
    fn test_media_quoted_values_unescape() {
        let set = media("text/html;title=\"say \\\"hi\\\"\"");
        let key = MediaType::new("text", "html").with_parameter("title", "say \"hi\"");
        assert_eq!(set.get(&PreferenceKey::Specific(key)), Some(q(1000)));
    }

    #[test]
    fn test_media_unclosed_quotes() {
        let err = parse_media_preferences("text/html;foo=\"bar").unwrap_err();
        assert!(err.to_string().starts_with("Unclosed quotes"), "{err}");
        // also when the quote spans what looks like more items
        assert!(parse_media_preferences("text/html;foo=\"bar, text/plain").is_err());
    }

    #[test]
    fn test_media_q_must_be_last() {
        // a parameter after q is an accept-extension: unsupported, the
        // range is downgraded to not-acceptable and the rest is dropped
        let set = media("text/html;level=1;q=0.5;ext=1, text/plain");
        assert_eq!(set.len(), 2);
        let leveled = MediaType::new("text", "html").with_parameter("level", "1");
        assert_eq!(
            set.get(&PreferenceKey::Specific(leveled)),
            Some(Quality::NOT_ACCEPTABLE),
        );
        assert_eq!(
            set.get(&PreferenceKey::Specific(MediaType::new("text", "plain"))),
            Some(q(1000)),
        );
    }

    #[test]
    fn test_media_extension_skip_is_quote_aware() {
        let set = media("text/html;q=0.5;ext=\"a, b\", text/plain;q=0.9");
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(&PreferenceKey::Specific(MediaType::new("text", "html"))),
            Some(Quality::NOT_ACCEPTABLE),
        );
        assert_eq!(
            set.get(&PreferenceKey::Specific(MediaType::new("text", "plain"))),
            Some(q(900)),
        );
    }

    #[test]
    fn test_media_q_parameter_is_not_stored() {
        let set = media("text/html;q=0.9");
        let entries: Vec<_> = set.iter().collect();
        let key = entries[0].0.as_specific().unwrap();
        assert!(key.parameters().is_empty());
    }

    #[test]
    fn test_media_whitespace_tolerance() {
        let set = media(" text/html ; level=1 ; q=0.5 ,\ttext/plain ");
        assert_eq!(set.len(), 2);
        let leveled = MediaType::new("text", "html").with_parameter("level", "1");
        assert_eq!(set.get(&PreferenceKey::Specific(leveled)), Some(q(500)));
    }

    #[test]
    fn test_media_errors() {
        for invalid in [
            "text",                  // no slash
            "text/",                 // no subtype
            "/html",                 // no type
            "text/html,,text/plain", // empty field
            ",text/html",            // empty field
            "text/html;level",       // missing =
            "text/html;=1",          // empty parameter name
            "text/html;q=9",         // malformed quality
            "text/html;foo=\"bar",   // unclosed quotes
            "text/html;foo=\"b\"x",  // garbage after quoted value
        ] {
            assert!(parse_media_preferences(invalid).is_err(), "{invalid:?}");
        }
    }

    #[test]
    fn test_media_trailing_commas_ignored() {
        assert_eq!(media("text/html,").len(), 1);
        assert_eq!(media("text/html,,").len(), 1);
        assert!(parse_media_preferences("text/html, ").is_err());
    }

    #[test]
    fn test_media_malformed_quality_message() {
        let err = parse_media_preferences("text/html;q=1.1").unwrap_err();
        assert_eq!(err.to_string(), "malformed quality value: \"1.1\"");
    }

    // ===== single media types =====

    #[test]
    fn test_single_media_type() {
        let media = parse_single_media_type("text/html; level=1").unwrap();
        assert_eq!(
            media,
            MediaType::new("text", "html").with_parameter("level", "1"),
        );
        // q stays an ordinary parameter outside of Accept
        let media = parse_single_media_type("text/html;q=0.5").unwrap();
        assert_eq!(media.parameter("q"), Some("0.5"));

        assert!(parse_single_media_type("").is_err());
        assert!(parse_single_media_type("text/html, text/plain").is_err());
    }
}
