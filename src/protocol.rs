//! Wire frames exchanged with the chat backend.
//!
//! Every frame is a single JSON text message. Inbound frames are decoded
//! leniently: any top-level field may be absent or `null` and falls back to
//! its default. The shape itself is checked strictly, so a payload that is not
//! a JSON object, or that carries a field of the wrong type, is rejected as a
//! whole and never reaches the transcript.

use serde::{Deserialize, Deserializer, Serialize};

/// Text of the sentinel frame sent once after the connection opens.
pub const START_SENTINEL: &str = "start";

/// Title shown on a property card when the backend sends none.
pub const DEFAULT_PROPERTY_TITLE: &str = "Property";

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A backend → client message: one bot turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Bot utterance; empty when absent.
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// Quick replies offered for this turn only.
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<QuickReply>,
    /// Result cards to show under the bubble.
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<Property>,
}

impl InboundFrame {
    /// Decode a raw text payload.
    pub fn decode(raw: &str) -> Result<Self, FrameError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(FrameError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// One quick-reply choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

impl QuickReply {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Text shown on the control and in the user bubble once chosen.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.value
        } else {
            &self.label
        }
    }
}

/// A listing returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bedrooms: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price_per_month: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub furnished: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_garden: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parking: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Property {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            DEFAULT_PROPERTY_TITLE
        } else {
            &self.title
        }
    }

    /// External link, if the backend sent a non-empty one.
    pub fn link(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

/// A client → backend message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub text: String,
}

impl OutboundFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The greeting request sent right after the connection opens.
    pub fn start() -> Self {
        Self::new(START_SENTINEL)
    }

    pub fn encode(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}
