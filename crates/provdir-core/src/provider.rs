use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::utilization::{Utilization, UtilizationTotals};

/// A simulated practitioner affiliated with a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinician {
    pub id: String,
    #[serde(rename = "givenName")]
    pub given_name: String,
    #[serde(rename = "familyName")]
    pub family_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gender: Option<String>,
    pub specialty: String,
    #[serde(rename = "encounterCount", default)]
    pub encounter_count: u64,
}

impl Clinician {
    pub fn new(
        id: impl Into<String>,
        given_name: impl Into<String>,
        family_name: impl Into<String>,
        specialty: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            given_name: given_name.into(),
            family_name: family_name.into(),
            gender: None,
            specialty: specialty.into(),
            encounter_count: 0,
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_encounter_count(mut self, count: u64) -> Self {
        self.encounter_count = count;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

/// A simulated healthcare organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(rename = "bedCount", skip_serializing_if = "Option::is_none", default)]
    pub bed_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<String>,
    /// Specialty -> affiliated clinicians, in insertion order
    #[serde(default)]
    pub clinicians: IndexMap<String, Vec<Clinician>>,
    #[serde(default)]
    pub utilization: Utilization,
}

impl Provider {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bed_count: None,
            phone: None,
            city: None,
            state: None,
            clinicians: IndexMap::new(),
            utilization: Utilization::new(),
        }
    }

    pub fn with_bed_count(mut self, beds: u32) -> Self {
        self.bed_count = Some(beds);
        self
    }

    pub fn with_location(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.state = Some(state.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_utilization(mut self, utilization: Utilization) -> Self {
        self.utilization = utilization;
        self
    }

    /// Affiliate a clinician under their specialty
    pub fn add_clinician(&mut self, clinician: Clinician) {
        self.clinicians
            .entry(clinician.specialty.clone())
            .or_default()
            .push(clinician);
    }

    pub fn with_clinician(mut self, clinician: Clinician) -> Self {
        self.add_clinician(clinician);
        self
    }

    /// Every clinician, specialty by specialty in insertion order
    pub fn clinicians(&self) -> impl Iterator<Item = &Clinician> + '_ {
        self.clinicians.values().flatten()
    }

    pub fn totals(&self) -> UtilizationTotals {
        self.utilization.totals()
    }
}

/// Parse a population fixture: a JSON array of providers in registry order.
///
/// Provider ids must be unique, and every clinician must be filed under its own specialty.
pub fn population_from_json(text: &str) -> Result<Vec<Provider>> {
    let providers: Vec<Provider> = serde_json::from_str(text)?;

    let mut seen = HashSet::new();
    for provider in &providers {
        if !seen.insert(provider.id.as_str()) {
            return Err(CoreError::invalid_population(format!(
                "duplicate provider id {}",
                provider.id
            )));
        }
        for (specialty, clinicians) in &provider.clinicians {
            if let Some(misfiled) = clinicians.iter().find(|c| &c.specialty != specialty) {
                return Err(CoreError::invalid_population(format!(
                    "clinician {} of provider {} is filed under {specialty} but has specialty {}",
                    misfiled.id, provider.id, misfiled.specialty
                )));
            }
        }
    }

    Ok(providers)
}
