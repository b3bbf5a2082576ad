//! Placeholder reference rewrite.
//!
//! Turns every entry into an idempotent replace against a dummy server so that a
//! bundle merged into a larger import refers to existing organizations and
//! practitioners instead of creating them.

use crate::bundle::{EntryRequest, ExportBundle, HttpVerb};
use crate::variant::RewriteSupport;

pub const PLACEHOLDER_BASE_URL: &str = "http://synthea-dummy/fhir";

/// Rewrite every entry's transport fields the variant supports
pub fn apply_dummy_reference_rewrite(bundle: &mut ExportBundle, support: RewriteSupport) {
    for entry in bundle.entries_mut() {
        let relative = entry.resource.relative_address();
        entry.full_url = format!("{PLACEHOLDER_BASE_URL}/{relative}");
        if support == RewriteSupport::FullUrlAndRequest {
            entry.request = Some(EntryRequest {
                method: HttpVerb::Put,
                url: relative,
            });
        }
    }
}
