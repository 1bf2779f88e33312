use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A quality value (`q`-value), defined in
/// [RFC7231](https://datatracker.ietf.org/doc/html/rfc7231#section-5.3.1).
///
/// A quality value is a client-stated relative preference weight between
/// 0 (not acceptable) and 1 (most preferred), with at most three decimal
/// digits of precision. It is stored as a fixed-point integer weight in
/// `[0, 1000]` so that negotiation scores are bit-identical across runs;
/// no floating point is involved anywhere in the scoring path.
///
/// # ABNF
///
/// ```text
/// weight = OWS ";" OWS "q=" qvalue
/// qvalue = ( "0" [ "." 0*3DIGIT ] )
///        / ( "1" [ "." 0*3("0") ] )
/// ```
///
/// # Examples
///
/// ```
/// use conneg::Quality;
///
/// let q: Quality = "0.5".parse().unwrap();
/// assert_eq!(q.as_millis(), 500);
/// assert!(q.is_acceptable());
/// assert!(!q.is_preferred());
///
/// assert_eq!("1.000".parse::<Quality>().unwrap(), Quality::HIGHEST);
/// assert!("1.001".parse::<Quality>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quality(u16);

impl Quality {
    /// The variant carrying this weight must not be served (`q=0`).
    pub const NOT_ACCEPTABLE: Self = Self(0);

    /// The lowest weight that is still acceptable (`q=0.001`).
    pub const LOWEST: Self = Self(1);

    /// The highest possible weight (`q=1`).
    pub const HIGHEST: Self = Self(1000);

    /// The weight assumed when no `q` parameter is present.
    pub const DEFAULT: Self = Self::HIGHEST;

    /// Create a quality from a weight in thousandths, `None` if out of range.
    #[must_use]
    pub const fn from_millis(millis: u16) -> Option<Self> {
        if millis <= 1000 { Some(Self(millis)) } else { None }
    }

    /// The weight in thousandths, `0..=1000`.
    #[must_use]
    pub const fn as_millis(self) -> u16 {
        self.0
    }

    /// `false` only for `q=0`.
    #[must_use]
    pub const fn is_acceptable(self) -> bool {
        self.0 != 0
    }

    /// `true` only for `q=1`.
    #[must_use]
    pub const fn is_preferred(self) -> bool {
        self.0 == 1000
    }

    /// The weight as a float in `[0.0, 1.0]`.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 1000.0
    }

    /// The weight as a float in `[0.0, 1.0]`.
    #[must_use]
    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / 1000.0
    }
}

impl Default for Quality {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u16> for Quality {
    type Error = Error;

    fn try_from(millis: u16) -> Result<Self, Self::Error> {
        Self::from_millis(millis).ok_or_else(|| Error::malformed_quality(millis.to_string()))
    }
}

impl From<Quality> for u16 {
    #[inline]
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl FromStr for Quality {
    type Err = Error;

    /// Parse a qvalue token.
    ///
    /// The grammar is strict: 1 to 5 characters, a leading `0` or `1`, a `.`
    /// at index 1 when anything follows, and only zeros after a leading `1`.
    /// Everything else is a malformed quality value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 5 {
            return Err(Error::malformed_quality(s));
        }
        if bytes.len() > 1 && bytes[1] != b'.' {
            return Err(Error::malformed_quality(s));
        }
        let fraction = bytes.get(2..).unwrap_or_default();
        match bytes[0] {
            b'1' => {
                if fraction.iter().all(|&b| b == b'0') {
                    Ok(Self(1000))
                } else {
                    Err(Error::malformed_quality(s))
                }
            }
            b'0' => {
                // Up to three digits after the dot; a shorter token is
                // right-padded with zeros ("0.5" == "0.500").
                let mut weight = 0u16;
                let mut scale = 100u16;
                for &b in fraction {
                    if !b.is_ascii_digit() {
                        return Err(Error::malformed_quality(s));
                    }
                    weight += u16::from(b - b'0') * scale;
                    scale /= 10;
                }
                Ok(Self(weight))
            }
            _ => Err(Error::malformed_quality(s)),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => f.write_str("0"),
            1000 => f.write_str("1"),
            weight => write!(f, "0.{weight:03}"),
        }
    }
}
