//! Transcript rendering.
//!
//! Rendering is split in two: pure functions turn bot/user text and property
//! records into immutable [`TranscriptEntry`] values, and the `append_*`
//! helpers hand those values to whatever [`TranscriptView`] hosts the
//! transcript. The renderer keeps no state of its own.

use crate::protocol::Property;
use crate::view::TranscriptView;

/// Label on the external link of a property card.
pub const VIEW_DETAILS_LABEL: &str = "View details";

/// Which party a bubble belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    User,
    Bot,
}

/// One run of bubble content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub side: Side,
    pub content: Vec<Inline>,
}

impl Bubble {
    /// The bubble's text with emphasis markers and line breaks flattened.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for inline in &self.content {
            match inline {
                Inline::Text(t) | Inline::Strong(t) => out.push_str(t),
                Inline::LineBreak => out.push('\n'),
            }
        }
        out
    }
}

/// An external link that must open in a fresh browsing context without a
/// reference back to the page that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLink {
    pub href: String,
    pub label: &'static str,
    pub new_context: bool,
    pub no_opener: bool,
}

/// Display-ready summary of one [`Property`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCard {
    pub title: String,
    pub location: String,
    pub bedrooms: String,
    pub price: String,
    pub amenities: String,
    pub score: Option<String>,
    pub link: Option<CardLink>,
}

impl PropertyCard {
    /// The metadata lines in display order, score line included when present.
    pub fn lines(&self) -> Vec<&str> {
        let mut lines = vec![
            self.location.as_str(),
            self.bedrooms.as_str(),
            self.price.as_str(),
            self.amenities.as_str(),
        ];
        if let Some(score) = &self.score {
            lines.push(score);
        }
        lines
    }
}

/// A rendered unit of the transcript. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    Bubble(Bubble),
    PropertyGrid(Vec<PropertyCard>),
}

/// Apply the bubble markup rules: `\n` becomes a line break and text
/// between a pair of `**` becomes emphasis. Single pass, left to right,
/// no nesting and no escapes; an unpaired `**` stays literal.
pub fn format_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else {
            break;
        };
        push_lines(&mut out, &rest[..open], false);
        push_lines(&mut out, &after[..close], true);
        rest = &after[close + 2..];
    }
    push_lines(&mut out, rest, false);
    out
}

fn push_lines(out: &mut Vec<Inline>, text: &str, strong: bool) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(Inline::LineBreak);
        }
        if line.is_empty() {
            continue;
        }
        out.push(if strong {
            Inline::Strong(line.to_string())
        } else {
            Inline::Text(line.to_string())
        });
    }
}

pub fn bubble(text: &str, side: Side) -> TranscriptEntry {
    TranscriptEntry::Bubble(Bubble {
        side,
        content: format_inline(text),
    })
}

/// Format a JSON number the way it reads on the wire: integers without a
/// fractional part, everything else as-is.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn amenity(present: bool, yes: &str, no: &str) -> String {
    let label = if present { yes } else { no };
    label.to_string()
}

pub fn property_card(property: &Property) -> PropertyCard {
    let amenities = [
        amenity(property.furnished, "✅ Furnished", "🚫 Furnished"),
        amenity(property.has_garden, "🌿 Garden", "—"),
        amenity(property.parking, "🚗 Parking", "—"),
    ]
    .join(" · ");

    PropertyCard {
        title: property.display_title().to_string(),
        location: format!("📍 {}", property.location),
        bedrooms: format!("🛏 {} bedrooms", format_number(property.bedrooms)),
        price: format!("💷 £{}/month", format_number(property.price_per_month)),
        amenities,
        score: property
            .score
            .map(|s| format!("⭐ Match score: {}", format_number(s))),
        link: property.link().map(|href| CardLink {
            href: href.to_string(),
            label: VIEW_DETAILS_LABEL,
            new_context: true,
            no_opener: true,
        }),
    }
}

/// One grid holding a card per property, in input order. `None` when there
/// is nothing to show.
pub fn property_grid(properties: &[Property]) -> Option<TranscriptEntry> {
    if properties.is_empty() {
        return None;
    }
    Some(TranscriptEntry::PropertyGrid(
        properties.iter().map(property_card).collect(),
    ))
}

pub fn append_bubble<V: TranscriptView + ?Sized>(view: &mut V, text: &str, side: Side) {
    view.append_entry(bubble(text, side));
    view.scroll_to_bottom();
}

pub fn append_property_grid<V: TranscriptView + ?Sized>(view: &mut V, properties: &[Property]) {
    if let Some(grid) = property_grid(properties) {
        view.append_entry(grid);
        view.scroll_to_bottom();
    }
}
