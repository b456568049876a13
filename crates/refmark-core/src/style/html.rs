//! HTML rendering of listing entries.

use std::fmt::Write;

use crate::bibliography::{Name, Reference};

/// Escape text for inclusion in HTML content or attribute values.
pub(crate) fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Body of one listing entry:
/// `Authors (Year). <em>Title</em>. Container, volume, pages. Publisher. link`
pub(crate) fn entry_body(reference: &Reference) -> String {
    let mut body = String::new();

    let authors = join_names(reference.creators());
    if !authors.is_empty() {
        body.push_str(&escape(&authors));
        body.push(' ');
    }
    match reference.year() {
        Some(year) => {
            let _ = write!(body, "({year}).");
        }
        None => body.push_str("(n.d.)."),
    }

    if let Some(title) = non_empty(reference.title.as_deref()) {
        let _ = write!(body, " <em>{}</em>.", escape(title));
    }

    if let Some(container) = non_empty(reference.container_title.as_deref()) {
        let mut segment = escape(container);
        for part in [&reference.volume, &reference.page].into_iter().flatten() {
            segment.push_str(", ");
            segment.push_str(&escape(&part.as_string()));
        }
        let _ = write!(body, " {segment}.");
    }

    if let Some(publisher) = non_empty(reference.publisher.as_deref()) {
        let _ = write!(body, " {}.", escape(publisher));
    }

    let link = non_empty(reference.doi.as_deref())
        .map(|doi| format!("https://doi.org/{doi}"))
        .or_else(|| non_empty(reference.url.as_deref()).map(str::to_owned));
    if let Some(link) = link {
        let link = escape(&link);
        let _ = write!(body, " <a href=\"{link}\">{link}</a>");
    }

    body
}

/// "A", "A & B", "A, B & C".
fn join_names(names: &[Name]) -> String {
    let names: Vec<String> = names
        .iter()
        .map(Name::display_name)
        .filter(|name| !name.is_empty())
        .collect();
    match names.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} & {last}", rest.join(", ")),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
