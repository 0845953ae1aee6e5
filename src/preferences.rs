//! Per-connection preferences and the inbound message parser.
//!
//! Inbound shape: `{ "dataSources": string | [string], "channels": string | [string] }`.
//! Anything else (bad JSON, a non-object, wrong field types) degrades to
//! empty lists, which downstream means "select all".

use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPreferences {
    /// Lowercased, deduplicated source ids as requested (not yet validated).
    pub selected_sources: Vec<String>,
    /// Lowercased, deduplicated channel ids as requested (not yet validated).
    pub selected_channels: Vec<String>,
}

impl SessionPreferences {
    pub fn new<S: AsRef<str>>(sources: &[S], channels: &[S]) -> Self {
        Self {
            selected_sources: normalize_ids(sources.iter().map(AsRef::as_ref)),
            selected_channels: normalize_ids(channels.iter().map(AsRef::as_ref)),
        }
    }

    /// Lenient parse; malformed input yields empty preferences.
    pub fn parse(message: &str) -> Self {
        Self::try_parse(message).unwrap_or_default()
    }

    /// `None` when the message is not a JSON object.
    pub fn try_parse(message: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(message).ok()?;
        let obj = value.as_object()?;
        Some(Self {
            selected_sources: field_list(obj.get("dataSources")),
            selected_channels: field_list(obj.get("channels")),
        })
    }

    pub fn is_select_all(&self) -> bool {
        self.selected_sources.is_empty() && self.selected_channels.is_empty()
    }
}

fn field_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => normalize_ids(std::iter::once(s.as_str())),
        Some(Value::Array(items)) => normalize_ids(items.iter().filter_map(Value::as_str)),
        _ => Vec::new(),
    }
}

fn normalize_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        let id = id.to_lowercase();
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
