//! DSTU2 shapes: single-valued organization type and practitioner name, with the
//! family name as a list.

use provdir_core::{Clinician, Provider};
use serde_json::json;

use super::{
    ORGANIZATION_IDENTIFIER_SYSTEM, PRACTITIONER_IDENTIFIER_SYSTEM, contact_fields, into_object,
};
use crate::bundle::{ExportBundle, Extension, RecordKind};
use crate::variant::{RecordBuilder, SchemaVariant, administrative_gender, append_record};

const ORGANIZATION_TYPE_SYSTEM: &str = "http://hl7.org/fhir/organization-type";

pub struct Dstu2Builder;

impl RecordBuilder for Dstu2Builder {
    fn variant(&self) -> SchemaVariant {
        SchemaVariant::Dstu2
    }

    fn build_organization(
        &self,
        bundle: &mut ExportBundle,
        provider: &Provider,
        extensions: Vec<Extension>,
    ) -> usize {
        let mut body = into_object(json!({
            "identifier": [{
                "system": ORGANIZATION_IDENTIFIER_SYSTEM,
                "value": provider.id,
            }],
            "active": true,
            "type": {
                "coding": [{
                    "system": ORGANIZATION_TYPE_SYSTEM,
                    "code": "prov",
                    "display": "Healthcare Provider",
                }],
                "text": "Healthcare Provider",
            },
            "name": provider.name,
        }));
        contact_fields(&mut body, provider);

        append_record(bundle, RecordKind::Organization, &provider.id, body, extensions)
    }

    fn build_practitioner(
        &self,
        bundle: &mut ExportBundle,
        clinician: &Clinician,
        extensions: Vec<Extension>,
    ) -> usize {
        let mut body = into_object(json!({
            "identifier": [{
                "system": PRACTITIONER_IDENTIFIER_SYSTEM,
                "value": clinician.id,
            }],
            "active": true,
            "name": {
                "family": [clinician.family_name],
                "given": [clinician.given_name],
                "prefix": ["Dr."],
            },
        }));
        if let Some(gender) = clinician.gender.as_deref().and_then(administrative_gender) {
            body.insert("gender".to_string(), json!(gender));
        }

        append_record(bundle, RecordKind::Practitioner, &clinician.id, body, extensions)
    }
}
