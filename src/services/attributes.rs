use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// key="value" tokens (tvg-id="...", group-title="...", etc)
    static ref ATTR_REGEX: Regex = Regex::new(r#"([A-Za-z0-9][A-Za-z0-9-]*)="([^"]*)""#).unwrap();
}

pub const TVG_ID: &str = "tvg-id";
pub const TVG_NAME: &str = "tvg-name";
pub const TVG_LOGO: &str = "tvg-logo";
pub const GROUP_TITLE: &str = "group-title";

/// Extract quoted `key="value"` attributes from the attribute region of a
/// directive line.
///
/// Keys are stored lowercase; values are kept verbatim. Unknown keys are
/// returned too and simply ignored by callers. When a key repeats, the
/// first occurrence wins.
pub fn extract_attributes(region: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();

    for caps in ATTR_REGEX.captures_iter(region) {
        let key = caps.get(1).map(|m| m.as_str().to_ascii_lowercase()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        attributes.entry(key).or_insert(value);
    }

    attributes
}

/// Look up an attribute, treating empty or blank values as absent.
pub fn non_empty<'a>(attributes: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    attributes
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
