//! Usage aggregation and eligibility filtering.

use provdir_core::{Clinician, Provider, UtilizationTotals};

/// Per-metric totals summed across every period of the provider's utilization
pub fn totals_for(provider: &Provider) -> UtilizationTotals {
    provider.utilization.totals()
}

/// A provider is exported only if it saw at least one encounter
pub fn provider_eligible(provider: &Provider) -> bool {
    totals_for(provider).encounters > 0
}

pub fn clinician_eligible(clinician: &Clinician) -> bool {
    clinician.encounter_count > 0
}
