//! Resolution of per-field extraction policies.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ScanError, ScanResult};
use crate::extractor::Extractor;

/// Policy that binds a record without assigning the node's own value.
pub const SKIP_POLICY: &str = "_";

static ATTR_POLICY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^attr\(([A-Za-z0-9_:-]+)\)$").expect("attr policy pattern is a valid regex")
});

/// Resolve a policy string into the extractor it names.
///
/// `"_"` resolves to `None`: the node only recurses into its children.
pub fn resolve_policy(policy: &str) -> ScanResult<Option<Extractor>> {
    let policy = policy.trim();

    match policy {
        SKIP_POLICY => Ok(None),
        "" | "text" => Ok(Some(Extractor::Text)),
        "html" => Ok(Some(Extractor::Html)),
        _ => match ATTR_POLICY.captures(policy) {
            Some(caps) => Ok(Some(Extractor::Attr(caps[1].to_string()))),
            None => Err(ScanError::InvalidPolicy(policy.to_string())),
        },
    }
}
