//! # Server-Driven HTTP Content Negotiation
//!
//! conneg has the opinion that content negotiation belongs on the server:
//! the client states its preferences through the `Accept`, `Accept-Charset`,
//! `Accept-Encoding` and `Accept-Language` request headers, and the server
//! computes the best representation from the list a resource can actually
//! produce — rather than bouncing a list back for the client to choose from.
//!
//! The engine is three layers, bottom up:
//!
//! - [`Quality`] — the fixed-point `q`-value weight, `0` up to `1` in
//!   thousandths. Strictly parsed; malformed weights are rejected, never
//!   guessed at.
//! - [`accept`] — parsers turning each raw header value into an ordered
//!   [`PreferenceSet`]: requested values (or the `*` wildcard) mapped to
//!   weights, in the order the client listed them.
//! - [`Negotiation`] — accumulates the four header families and selects the
//!   best [`Variant`] (media type × encoding × language) from the
//!   candidates, scoring every dimension and breaking ties by specificity,
//!   explicitness and finally list order.
//!
//! Parsing is strict on purpose: one malformed segment fails that whole
//! header with a descriptive [`Error`] — a negotiation never silently runs
//! on half a constraint. Selection is pure and deterministic: scores are
//! computed on scaled integers, so the same inputs always produce the same
//! variant, bit for bit.
//!
//! # Examples
//!
//! ```
//! use conneg::{LanguageTag, Negotiation, Variant};
//!
//! let negotiation = Negotiation::new()
//!     .with_accept(["text/html;q=0.9, text/plain;q=0.5, */*;q=0.1"])?
//!     .with_accept_language(["en;q=0.8, fr"])?;
//!
//! let variants = [
//!     Variant::new()
//!         .with_media_type(mime::TEXT_PLAIN)
//!         .with_language(LanguageTag::new("en")),
//!     Variant::new()
//!         .with_media_type(mime::TEXT_HTML)
//!         .with_language(LanguageTag::new("fr")),
//! ];
//!
//! // text/html at q=0.9 with fr at q=1 beats text/plain + en
//! assert_eq!(negotiation.select(&variants), Some(&variants[1]));
//! # Ok::<_, conneg::Error>(())
//! ```
//!
//! Variants are whatever the resource layer can produce; build them
//! directly or cross whole axes with [`VariantListBuilder`]. When a
//! request's headers are already at hand, [`Negotiation::from_headers`]
//! ingests all four families in one go.

#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

mod error;
#[doc(inline)]
pub use error::Error;

mod quality;
pub use quality::Quality;

mod media_type;
pub use media_type::MediaType;

mod language;
pub use language::LanguageTag;

mod preference;
pub use preference::{PreferenceKey, PreferenceSet};

pub mod accept;

mod variant;
pub use variant::{Variant, VariantListBuilder};

mod negotiate;
pub use negotiate::Negotiation;

pub mod dep {
    //! dependencies of conneg, re-exported for downstream convenience

    pub use http;
    pub use indexmap;
    pub use mime;
}
