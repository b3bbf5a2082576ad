//! Directory bundle construction.

use provdir_core::{Clinician, Metric, Provider};
use tracing::debug;

use crate::bundle::{BundleType, ExportBundle, Extension};
use crate::usage::{clinician_eligible, provider_eligible, totals_for};
use crate::variant::RecordBuilder;

/// Base of every extension URI attached to exported records
pub const EXTENSION_BASE_URI: &str = "http://synthetichealth.github.io/synthea/";

/// `utilization-<metric>-extension` URI for a utilization total
pub fn utilization_extension_url(metric: Metric) -> String {
    format!("{EXTENSION_BASE_URI}utilization-{}-extension", metric.as_str())
}

pub fn bed_count_extension_url() -> String {
    format!("{EXTENSION_BASE_URI}bed-count-extension")
}

/// Four utilization totals, always present, then the bed count when declared
pub fn organization_extensions(provider: &Provider) -> Vec<Extension> {
    let totals = totals_for(provider);
    let mut extensions: Vec<Extension> = Metric::ALL
        .into_iter()
        .map(|metric| Extension::integer(utilization_extension_url(metric), totals.get(metric)))
        .collect();
    if let Some(beds) = provider.bed_count {
        extensions.push(Extension::integer(bed_count_extension_url(), u64::from(beds)));
    }
    extensions
}

pub fn practitioner_extensions(clinician: &Clinician) -> Vec<Extension> {
    vec![Extension::integer(
        utilization_extension_url(Metric::Encounters),
        clinician.encounter_count,
    )]
}

/// One organization record per provider with at least one encounter, in registry order
pub fn build_provider_directory(
    providers: &[Provider],
    builder: &dyn RecordBuilder,
    bundle_type: BundleType,
) -> ExportBundle {
    let mut bundle = ExportBundle::new(bundle_type);
    for provider in providers.iter().filter(|p| provider_eligible(p)) {
        builder.build_organization(&mut bundle, provider, organization_extensions(provider));
    }

    debug!(
        variant = %builder.variant(),
        providers = providers.len(),
        records = bundle.len(),
        "Built provider directory"
    );
    bundle
}

/// One practitioner record per clinician with encounters at a provider with encounters.
///
/// Providers are visited in registry order, specialties in insertion order.
pub fn build_practitioner_directory(
    providers: &[Provider],
    builder: &dyn RecordBuilder,
    bundle_type: BundleType,
) -> ExportBundle {
    let mut bundle = ExportBundle::new(bundle_type);
    for provider in providers.iter().filter(|p| provider_eligible(p)) {
        for clinician in provider.clinicians().filter(|c| clinician_eligible(c)) {
            builder.build_practitioner(&mut bundle, clinician, practitioner_extensions(clinician));
        }
    }

    debug!(
        variant = %builder.variant(),
        providers = providers.len(),
        records = bundle.len(),
        "Built practitioner directory"
    );
    bundle
}
