//! Target schema variants and their record builders.

use std::fmt;

use provdir_core::{Clinician, Provider};
use serde_json::{Map, Value};

use crate::bundle::{
    BundleEntry, BundleType, EntryRequest, ExportBundle, Extension, HttpVerb, Record, RecordKind,
};
use crate::variants::{Dstu2Builder, R4Builder, Stu3Builder};

/// Supported clinical-document format versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVariant {
    Dstu2,
    Stu3,
    R4,
}

/// Which entity class a directory export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Hospital,
    Practitioner,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Hospital, EntityKind::Practitioner];

    /// Segment used in `exporter.<kind>.<variant>.export`
    pub fn config_segment(&self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Practitioner => "practitioner",
        }
    }

    /// Output file prefix
    pub fn file_label(&self) -> &'static str {
        match self {
            Self::Hospital => "hospitalInformation",
            Self::Practitioner => "practitionerInformation",
        }
    }

    pub fn record_kind(&self) -> RecordKind {
        match self {
            Self::Hospital => RecordKind::Organization,
            Self::Practitioner => RecordKind::Practitioner,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_segment())
    }
}

/// Transport fields a variant can rewrite on each entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteSupport {
    /// Full address only
    FullUrl,
    /// Full address, verb and relative address
    FullUrlAndRequest,
}

impl SchemaVariant {
    pub const ALL: [SchemaVariant; 3] = [
        SchemaVariant::Dstu2,
        SchemaVariant::Stu3,
        SchemaVariant::R4,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Dstu2 => "dstu2",
            Self::Stu3 => "stu3",
            Self::R4 => "r4",
        }
    }

    /// Segment of the per-variant settings table, e.g. `exporter.fhir_r4.*`
    pub fn key_segment(&self) -> &'static str {
        match self {
            Self::Dstu2 => "fhir_dstu2",
            Self::Stu3 => "fhir_stu3",
            Self::R4 => "fhir_r4",
        }
    }

    fn export_segment(&self) -> &'static str {
        match self {
            Self::Dstu2 => "fhir_dstu2",
            Self::Stu3 => "fhir_stu3",
            Self::R4 => "fhir",
        }
    }

    pub fn export_enabled_key(&self, kind: EntityKind) -> String {
        format!(
            "exporter.{}.{}.export",
            kind.config_segment(),
            self.export_segment()
        )
    }

    pub fn exclude_resources_key(&self) -> String {
        format!(
            "exporter.{}.exclude_organization_and_practitioner_resources",
            self.key_segment()
        )
    }

    pub fn target_url_key(&self) -> String {
        format!("exporter.{}.target_server_base_url", self.key_segment())
    }

    /// Subfolder of the output base directory
    pub fn output_folder(&self) -> &'static str {
        match self {
            Self::Dstu2 => "fhir_dstu2",
            Self::Stu3 | Self::R4 => "fhir",
        }
    }

    /// Bundle type for a directory, given the transactional switch
    pub fn bundle_type(&self, kind: EntityKind, transactional: bool) -> BundleType {
        if !transactional {
            return BundleType::Collection;
        }
        match (self, kind) {
            (Self::R4, _) => BundleType::Batch,
            (Self::Stu3, _) => BundleType::Transaction,
            (Self::Dstu2, EntityKind::Hospital) => BundleType::Transaction,
            (Self::Dstu2, EntityKind::Practitioner) => BundleType::Batch,
        }
    }

    pub fn rewrite_support(&self) -> RewriteSupport {
        match self {
            Self::Stu3 => RewriteSupport::FullUrl,
            Self::Dstu2 | Self::R4 => RewriteSupport::FullUrlAndRequest,
        }
    }

    pub fn builder(&self) -> &'static dyn RecordBuilder {
        match self {
            Self::Dstu2 => &Dstu2Builder,
            Self::Stu3 => &Stu3Builder,
            Self::R4 => &R4Builder,
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds variant-shaped records into a bundle.
///
/// Each call appends one entry and returns its index in the bundle.
pub trait RecordBuilder: Send + Sync {
    fn variant(&self) -> SchemaVariant;

    fn build_organization(
        &self,
        bundle: &mut ExportBundle,
        provider: &Provider,
        extensions: Vec<Extension>,
    ) -> usize;

    fn build_practitioner(
        &self,
        bundle: &mut ExportBundle,
        clinician: &Clinician,
        extensions: Vec<Extension>,
    ) -> usize;
}

/// Append a record with the entry metadata every variant shares: a `urn:uuid:` full
/// address and, in transaction or batch bundles, a create request.
pub(crate) fn append_record(
    bundle: &mut ExportBundle,
    kind: RecordKind,
    id: &str,
    body: Map<String, Value>,
    extensions: Vec<Extension>,
) -> usize {
    let request = bundle
        .bundle_type()
        .is_transactional()
        .then(|| EntryRequest {
            method: HttpVerb::Post,
            url: kind.resource_type().to_string(),
        });

    bundle.push(BundleEntry {
        full_url: format!("urn:uuid:{id}"),
        resource: Record {
            kind,
            id: id.to_string(),
            body,
            extensions,
        },
        request,
    })
}

/// FHIR administrative gender from the simulation's gender code
pub(crate) fn administrative_gender(code: &str) -> Option<&'static str> {
    match code.to_ascii_uppercase().as_str() {
        "M" | "MALE" => Some("male"),
        "F" | "FEMALE" => Some("female"),
        _ => None,
    }
}
