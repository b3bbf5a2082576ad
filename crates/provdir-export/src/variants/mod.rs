//! Per-variant record builders.

mod dstu2;
mod r4;
mod stu3;

pub use dstu2::Dstu2Builder;
pub use r4::R4Builder;
pub use stu3::Stu3Builder;

use provdir_core::Provider;
use serde_json::{Map, Value, json};

pub(crate) const ORGANIZATION_IDENTIFIER_SYSTEM: &str = "https://github.com/synthetichealth/synthea";
pub(crate) const PRACTITIONER_IDENTIFIER_SYSTEM: &str = "http://hl7.org/fhir/sid/us-npi";

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Telecom and address fields shared by every organization shape
fn contact_fields(body: &mut Map<String, Value>, provider: &Provider) {
    if let Some(phone) = &provider.phone {
        body.insert(
            "telecom".to_string(),
            json!([{ "system": "phone", "value": phone }]),
        );
    }
    if provider.city.is_some() || provider.state.is_some() {
        let mut address = Map::new();
        if let Some(city) = &provider.city {
            address.insert("city".to_string(), json!(city));
        }
        if let Some(state) = &provider.state {
            address.insert("state".to_string(), json!(state));
        }
        address.insert("country".to_string(), json!("US"));
        body.insert("address".to_string(), json!([address]));
    }
}
