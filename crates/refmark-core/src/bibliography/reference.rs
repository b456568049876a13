//! CSL-JSON reference model.
//!
//! Only the fields the label and listing styles read are typed; everything
//! else lands in [`Reference::extra`] and is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// One bibliography entry in CSL-JSON form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    /// Citekey.
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub id: String,

    /// Item type (`book`, `article-journal`, ...).
    #[serde(rename = "type", default)]
    pub ref_type: String,

    #[serde(default)]
    pub author: Vec<Name>,

    #[serde(default)]
    pub editor: Vec<Name>,

    #[serde(default)]
    pub title: Option<String>,

    /// Journal, book or proceedings title.
    #[serde(rename = "container-title", default)]
    pub container_title: Option<String>,

    #[serde(default)]
    pub publisher: Option<String>,

    #[serde(default)]
    pub volume: Option<StringOrNumber>,

    #[serde(default)]
    pub page: Option<StringOrNumber>,

    #[serde(default)]
    pub issued: Option<DateVariable>,

    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,

    #[serde(rename = "URL", default)]
    pub url: Option<String>,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Reference {
    /// Authors, falling back to editors when there are none.
    #[must_use]
    pub fn creators(&self) -> &[Name] {
        if self.author.is_empty() {
            &self.editor
        } else {
            &self.author
        }
    }

    /// Year of issue, if known.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.issued.as_ref().and_then(DateVariable::year)
    }
}

/// A string or number value (CSL allows both for some fields).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(i64),
}

impl StringOrNumber {
    #[must_use]
    pub fn as_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }

    fn as_number(&self) -> Option<i64> {
        match self {
            Self::String(s) => s.trim().parse().ok(),
            Self::Number(n) => Some(*n),
        }
    }
}

/// CSL-JSON allows reference ids to be strings or integers.
fn deserialize_string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match StringOrNumber::deserialize(deserializer) {
        Ok(value) => Ok(value.as_string()),
        Err(_) => Err(Error::custom("expected string or number for id")),
    }
}

/// A personal or institutional name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Name {
    #[serde(default)]
    pub family: Option<String>,

    #[serde(default)]
    pub given: Option<String>,

    /// Particle kept with the family name ("van" in "van Gogh").
    #[serde(rename = "non-dropping-particle", default)]
    pub non_dropping_particle: Option<String>,

    #[serde(default)]
    pub suffix: Option<String>,

    /// Institutional name, used verbatim.
    #[serde(default)]
    pub literal: Option<String>,
}

impl Name {
    /// Short form used in author-year labels and for sorting.
    ///
    /// Family name with its non-dropping particle, else the literal, else the
    /// given name.
    #[must_use]
    pub fn short_name(&self) -> Option<String> {
        if let Some(family) = self.family.as_deref().filter(|f| !f.is_empty()) {
            return Some(match self.non_dropping_particle.as_deref() {
                Some(particle) => format!("{particle} {family}"),
                None => family.to_owned(),
            });
        }
        self.literal
            .clone()
            .or_else(|| self.given.clone())
            .filter(|s| !s.is_empty())
    }

    /// Full name in "family, given" order.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(literal) = &self.literal {
            return literal.clone();
        }

        let mut family_part = self.short_name().unwrap_or_default();
        if let Some(suffix) = &self.suffix {
            family_part.push(' ');
            family_part.push_str(suffix);
        }

        match &self.given {
            Some(given) if family_part.is_empty() => given.clone(),
            Some(given) => format!("{family_part}, {given}"),
            None => family_part,
        }
    }
}

/// A date in CSL-JSON form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateVariable {
    /// `[[year, month, day], [end_year, ...]]`; parts may be strings.
    #[serde(rename = "date-parts", default)]
    pub date_parts: Option<Vec<Vec<StringOrNumber>>>,

    #[serde(default)]
    pub literal: Option<String>,

    #[serde(default)]
    pub raw: Option<String>,
}

impl DateVariable {
    /// First year of the date.
    ///
    /// Falls back to the first four-digit run in `raw` or `literal`.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        let structured = self
            .date_parts
            .as_ref()
            .and_then(|parts| parts.first())
            .and_then(|first| first.first())
            .and_then(StringOrNumber::as_number)
            .and_then(|year| i32::try_from(year).ok());

        structured.or_else(|| {
            [self.raw.as_deref(), self.literal.as_deref()]
                .into_iter()
                .flatten()
                .find_map(first_year)
        })
    }
}

fn first_year(text: &str) -> Option<i32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 4)
        .and_then(|year| year.parse().ok())
}
