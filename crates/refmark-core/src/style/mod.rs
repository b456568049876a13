//! Label and listing styles.
//!
//! Two independently selectable styles shape the output:
//!
//! - [`LabelStyle`] (`citestyle`): inline labels and listing labels
//! - [`ListingStyle`] (`bibstyle`): which order the listing uses
//!
//! Names are resolved once, when a [`ReferenceStyle`] is built; an unknown
//! name is [`ReferenceError::UnknownLabelStyle`].
//!
//! Listing anchors are `reference<N>` with `N` the 1-based listing position,
//! and inline links always target that anchor.

mod author_year;
mod html;
mod listing;
mod numeric;

use std::borrow::Cow;

pub use listing::{FormattedBibliography, FormattedEntry};

use crate::bibliography::{Bibliography, Reference};
use crate::error::{ReferenceError, StyleKind};
use crate::index::ReferenceIndex;

/// Inline label style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelStyle {
    /// `<sup>[1, 2]</sup>`.
    Numeric,
    /// `(Smith 1999; Doe 2001)`.
    AuthorYear,
}

impl LabelStyle {
    /// Registered names.
    pub const NAMES: &'static [&'static str] = &["numeric", "author-year"];

    /// Resolve a configured name.
    ///
    /// `number-brackets` and `author_year` spellings are accepted too.
    pub fn from_name(name: &str) -> Result<Self, ReferenceError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number-brackets" | "number_brackets" => Ok(Self::Numeric),
            "author-year" | "author_year" | "authoryear" => Ok(Self::AuthorYear),
            _ => Err(ReferenceError::UnknownLabelStyle {
                kind: StyleKind::Citation,
                name: name.to_owned(),
                available: Self::NAMES,
            }),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::AuthorYear => "author-year",
        }
    }

    fn labels(self, entries: &[&Reference]) -> Vec<String> {
        match self {
            Self::Numeric => numeric::labels(entries.len()),
            Self::AuthorYear => author_year::labels(entries),
        }
    }

    /// Markup replacing one citation marker.
    ///
    /// Fails with [`ReferenceError::CitekeyNotFound`] if any key is not in
    /// the listing.
    pub fn inline_label(
        self,
        citekeys: &[String],
        bibliography: &FormattedBibliography,
    ) -> Result<String, ReferenceError> {
        match self {
            Self::Numeric => numeric::inline_label(citekeys, bibliography),
            Self::AuthorYear => author_year::inline_label(citekeys, bibliography),
        }
    }
}

/// Listing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingStyle {
    /// First-appearance citation order (`default`).
    CitationOrder,
    /// First author, year, title, citekey.
    Alphabetic,
}

impl ListingStyle {
    /// Registered names.
    pub const NAMES: &'static [&'static str] = &["default", "alphabetic"];

    /// Resolve a configured name; `unsrt` and `alpha` are aliases.
    pub fn from_name(name: &str) -> Result<Self, ReferenceError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" | "unsrt" => Ok(Self::CitationOrder),
            "alphabetic" | "alpha" => Ok(Self::Alphabetic),
            _ => Err(ReferenceError::UnknownLabelStyle {
                kind: StyleKind::Bibliography,
                name: name.to_owned(),
                available: Self::NAMES,
            }),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::CitationOrder => "default",
            Self::Alphabetic => "alphabetic",
        }
    }

    /// Reorder entries given in citation order.
    fn order(self, mut entries: Vec<&Reference>) -> Vec<&Reference> {
        if self == Self::Alphabetic {
            entries.sort_by_cached_key(|reference| sort_key(reference));
        }
        entries
    }
}

fn sort_key(reference: &Reference) -> (String, i32, String, String) {
    let author = reference
        .creators()
        .iter()
        .find_map(crate::bibliography::Name::short_name)
        .unwrap_or_default()
        .to_lowercase();
    let title = reference.title.clone().unwrap_or_default().to_lowercase();
    (
        author,
        reference.year().unwrap_or(i32::MAX),
        title,
        reference.id.clone(),
    )
}

/// Run-wide style selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSettings {
    /// Inline label style name.
    pub citestyle: String,
    /// Listing style name.
    pub bibstyle: String,
    /// Heading above the listing; empty for none.
    pub heading: String,
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        Self {
            citestyle: "numeric".to_owned(),
            bibstyle: "default".to_owned(),
            heading: "References".to_owned(),
        }
    }
}

/// Resolved styles used to render one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceStyle {
    label: LabelStyle,
    listing: ListingStyle,
    heading: String,
}

impl ReferenceStyle {
    /// Resolve both style names.
    pub fn from_settings(settings: &ReferenceSettings) -> Result<Self, ReferenceError> {
        Ok(Self {
            label: LabelStyle::from_name(&settings.citestyle)?,
            listing: ListingStyle::from_name(&settings.bibstyle)?,
            heading: settings.heading.clone(),
        })
    }

    /// Apply per-document overrides, borrowing `self` when there are none.
    pub fn with_overrides(
        &self,
        citestyle: Option<&str>,
        bibstyle: Option<&str>,
    ) -> Result<Cow<'_, Self>, ReferenceError> {
        if citestyle.is_none() && bibstyle.is_none() {
            return Ok(Cow::Borrowed(self));
        }
        Ok(Cow::Owned(Self {
            label: citestyle.map_or(Ok(self.label), LabelStyle::from_name)?,
            listing: bibstyle.map_or(Ok(self.listing), ListingStyle::from_name)?,
            heading: self.heading.clone(),
        }))
    }

    #[must_use]
    pub fn label_style(&self) -> LabelStyle {
        self.label
    }

    #[must_use]
    pub fn listing_style(&self) -> ListingStyle {
        self.listing
    }

    /// Format the cited entries of `bibliography` in listing order.
    ///
    /// Cited keys missing from the bibliography are left out; inline
    /// rendering reports them.
    #[must_use]
    pub fn render_bibliography(
        &self,
        bibliography: &Bibliography,
        index: &ReferenceIndex,
    ) -> FormattedBibliography {
        let cited: Vec<&Reference> = index
            .citekeys()
            .filter_map(|citekey| bibliography.get(citekey))
            .collect();
        let ordered = self.listing.order(cited);
        let labels = self.label.labels(&ordered);

        FormattedBibliography::new(
            ordered.iter().zip(labels).map(|(reference, label)| {
                (reference.id.clone(), label, html::entry_body(reference))
            }),
            &self.heading,
        )
    }

    /// Markup replacing one citation marker.
    pub fn inline_label(
        &self,
        citekeys: &[String],
        bibliography: &FormattedBibliography,
    ) -> Result<String, ReferenceError> {
        self.label.inline_label(citekeys, bibliography)
    }
}
