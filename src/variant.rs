use crate::{LanguageTag, MediaType};

/// One alternative representation of a resource, distinguished by media
/// type, content-encoding and/or language.
///
/// Any subset of the three dimensions may be declared; an undeclared
/// dimension is unconstrained for this representation. Variants are
/// supplied by the resource layer in the order it prefers them on ties.
///
/// # Examples
///
/// ```
/// use conneg::{LanguageTag, Variant};
///
/// let variant = Variant::new()
///     .with_media_type(mime::TEXT_HTML)
///     .with_encoding("gzip")
///     .with_language(LanguageTag::new("en").with_region("US"));
///
/// assert_eq!(variant.encoding(), Some("gzip"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variant {
    media_type: Option<MediaType>,
    encoding: Option<String>,
    language: Option<LanguageTag>,
}

impl Variant {
    /// Create a variant with no declared dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the media type of this variant.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<MediaType>) -> Self {
        self.set_media_type(media_type);
        self
    }

    /// Declare the media type of this variant.
    pub fn set_media_type(&mut self, media_type: impl Into<MediaType>) {
        self.media_type = Some(media_type.into());
    }

    /// Declare the content-encoding of this variant.
    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.set_encoding(encoding);
        self
    }

    /// Declare the content-encoding of this variant.
    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.encoding = Some(encoding.into());
    }

    /// Declare the language of this variant.
    #[must_use]
    pub fn with_language(mut self, language: LanguageTag) -> Self {
        self.set_language(language);
        self
    }

    /// Declare the language of this variant.
    pub fn set_language(&mut self, language: LanguageTag) {
        self.language = Some(language);
    }

    /// The declared media type, if any.
    #[must_use]
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// The declared content-encoding, if any.
    #[must_use]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// The declared language, if any.
    #[must_use]
    pub fn language(&self) -> Option<&LanguageTag> {
        self.language.as_ref()
    }

    /// How many of the three dimensions this variant declares.
    pub(crate) fn explicitness(&self) -> u8 {
        u8::from(self.media_type.is_some())
            + u8::from(self.encoding.is_some())
            + u8::from(self.language.is_some())
    }
}

/// Builds an ordered variant list as the cartesian product of the
/// dimension values a resource can produce.
///
/// Populate any of the three axes, then [`add`] to cross them into
/// variants; the axes reset afterwards so several groups can be chained.
/// [`build`] adds any pending axes first.
///
/// [`add`]: Self::add
/// [`build`]: Self::build
///
/// # Examples
///
/// ```
/// use conneg::{LanguageTag, VariantListBuilder};
///
/// let variants = VariantListBuilder::new()
///     .media_types([mime::TEXT_HTML, mime::APPLICATION_JSON])
///     .languages([LanguageTag::new("en"), LanguageTag::new("fr")])
///     .build();
///
/// // 2 media types x 2 languages
/// assert_eq!(variants.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VariantListBuilder {
    media_types: Vec<MediaType>,
    languages: Vec<LanguageTag>,
    encodings: Vec<String>,
    variants: Vec<Variant>,
}

impl VariantListBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the media types of the current group.
    #[must_use]
    pub fn media_types<I, M>(mut self, media_types: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MediaType>,
    {
        self.media_types = media_types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the languages of the current group.
    #[must_use]
    pub fn languages<I>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = LanguageTag>,
    {
        self.languages = languages.into_iter().collect();
        self
    }

    /// Set the content-encodings of the current group.
    #[must_use]
    pub fn encodings<I, E>(mut self, encodings: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<String>,
    {
        self.encodings = encodings.into_iter().map(Into::into).collect();
        self
    }

    /// Cross the pending axes into variants and reset them.
    ///
    /// With no axis populated this is a no-op.
    #[must_use]
    pub fn add(mut self) -> Self {
        if self.media_types.is_empty() && self.languages.is_empty() && self.encodings.is_empty() {
            return self;
        }
        let media_types = optional_axis(std::mem::take(&mut self.media_types));
        let languages = optional_axis(std::mem::take(&mut self.languages));
        let encodings = optional_axis(std::mem::take(&mut self.encodings));

        for media_type in &media_types {
            for language in &languages {
                for encoding in &encodings {
                    let mut variant = Variant::new();
                    if let Some(media_type) = media_type {
                        variant.set_media_type(media_type.clone());
                    }
                    if let Some(language) = language {
                        variant.set_language(language.clone());
                    }
                    if let Some(encoding) = encoding {
                        variant.set_encoding(encoding.clone());
                    }
                    self.variants.push(variant);
                }
            }
        }
        self
    }

    /// Finish the list, crossing any pending axes first.
    #[must_use]
    pub fn build(mut self) -> Vec<Variant> {
        if !self.media_types.is_empty() || !self.languages.is_empty() || !self.encodings.is_empty()
        {
            self = self.add();
        }
        self.variants
    }
}

/// An axis with no values contributes a single "undeclared" slot to the
/// product rather than collapsing it to nothing.
fn optional_axis<T>(values: Vec<T>) -> Vec<Option<T>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.into_iter().map(Some).collect()
    }
}
