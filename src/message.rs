//! Message composition: placeholder substitution over a channel body template.

use crate::channels::ChannelBlueprint;

/// Stand-in for `{{name}}`; no recipient identity reaches the pipeline.
pub const RECIPIENT_NAME: &str = "there";

/// Fill `{{interest}}`, `{{behavior}}` (lowercased) and `{{name}}`.
pub fn compose(blueprint: &ChannelBlueprint, interest: &str, behavior: &str) -> String {
    blueprint
        .body
        .replace("{{interest}}", interest)
        .replace("{{behavior}}", &behavior.to_lowercase())
        .replace("{{name}}", RECIPIENT_NAME)
}
