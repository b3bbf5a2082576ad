//! Export entry points.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use provdir_config::{Settings, keys};
use provdir_core::Provider;
use tracing::{debug, error, info, warn};

use crate::builder::{build_practitioner_directory, build_provider_directory};
use crate::bundle::BundleType;
use crate::error::Result;
use crate::rewrite::apply_dummy_reference_rewrite;
use crate::serialize::serialize;
use crate::sink::{
    DeliveryOutcome, DeliveryPlan, DeliveryStage, HttpRemoteSink, LocalOutputStore, S3Uploader,
    SinkDispatcher,
};
use crate::variant::{EntityKind, SchemaVariant};

/// Configuration inputs of one export, resolved once from a settings snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub variant: SchemaVariant,
    pub kind: EntityKind,
    pub enabled: bool,
    pub bundle_type: BundleType,
    pub rewrite_references: bool,
    pub remote_url: Option<String>,
    pub base_directory: PathBuf,
    pub compress: bool,
    pub upload: bool,
}

impl ExportOptions {
    pub fn from_settings(settings: &Settings, variant: SchemaVariant, kind: EntityKind) -> Self {
        let remote_url = settings
            .get(&variant.target_url_key())
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Self {
            variant,
            kind,
            enabled: settings.get_bool(&variant.export_enabled_key(kind)),
            bundle_type: variant.bundle_type(kind, settings.get_bool(keys::TRANSACTION_BUNDLE)),
            rewrite_references: settings.get_bool(&variant.exclude_resources_key()),
            remote_url,
            base_directory: PathBuf::from(
                settings.get_or(keys::BASE_DIRECTORY, keys::DEFAULT_BASE_DIRECTORY),
            ),
            compress: settings.get_bool(keys::COMPRESS_DATA),
            upload: settings.get_bool(keys::AWS_S3_EXPORT_ENABLED),
        }
    }

    /// `<baseDirectory>/<variantFolder>/<label><stop>.json`
    pub fn output_path(&self, stop: i64) -> PathBuf {
        self.base_directory
            .join(self.variant.output_folder())
            .join(format!("{}{stop}.json", self.kind.file_label()))
    }

    pub fn delivery_plan(&self, stop: i64) -> DeliveryPlan {
        DeliveryPlan {
            remote_url: self.remote_url.clone(),
            output_path: self.output_path(stop),
            compress: self.compress,
            upload: self.upload,
        }
    }
}

/// What one export call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportReport {
    Disabled {
        variant: SchemaVariant,
        kind: EntityKind,
    },
    Completed {
        variant: SchemaVariant,
        kind: EntityKind,
        records: usize,
        outcome: DeliveryOutcome,
    },
}

impl ExportReport {
    pub fn outcome(&self) -> Option<&DeliveryOutcome> {
        match self {
            Self::Disabled { .. } => None,
            Self::Completed { outcome, .. } => Some(outcome),
        }
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled { variant, kind } => write!(f, "{variant} {kind}: disabled"),
            Self::Completed {
                variant,
                kind,
                records,
                outcome,
            } => write!(f, "{variant} {kind}: {records} records, {outcome}"),
        }
    }
}

/// Runs directory exports against one settings snapshot
pub struct DirectoryExporter {
    settings: Arc<Settings>,
    dispatcher: SinkDispatcher,
}

impl DirectoryExporter {
    pub fn new(settings: Arc<Settings>, dispatcher: SinkDispatcher) -> Self {
        Self {
            settings,
            dispatcher,
        }
    }

    /// Exporter wired to the HTTP, filesystem and (when enabled) S3 sinks
    pub fn from_settings(settings: Arc<Settings>) -> Result<Self> {
        let timeout = Duration::from_secs(settings.get_u64_or(
            keys::HTTP_TIMEOUT_SECONDS,
            keys::DEFAULT_HTTP_TIMEOUT_SECONDS,
        ));
        let mut dispatcher = SinkDispatcher::new(
            Arc::new(HttpRemoteSink::new(timeout)?),
            Arc::new(LocalOutputStore::new()),
        );
        if settings.get_bool(keys::AWS_S3_EXPORT_ENABLED) {
            dispatcher = dispatcher.with_uploader(Arc::new(S3Uploader::from_settings(&settings)));
        }

        Ok(Self::new(settings, dispatcher))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self, variant: SchemaVariant, kind: EntityKind) -> ExportOptions {
        ExportOptions::from_settings(&self.settings, variant, kind)
    }

    pub async fn export_organizations(
        &self,
        variant: SchemaVariant,
        providers: &[Provider],
        stop: i64,
    ) -> ExportReport {
        self.export(variant, EntityKind::Hospital, providers, stop).await
    }

    pub async fn export_practitioners(
        &self,
        variant: SchemaVariant,
        providers: &[Provider],
        stop: i64,
    ) -> ExportReport {
        self.export(variant, EntityKind::Practitioner, providers, stop)
            .await
    }

    /// Every variant and entity kind, one report each, in [`SchemaVariant::ALL`] order.
    ///
    /// STU3 and R4 share the `fhir` output folder and every export gets the same
    /// `stop`, so when both write locally for the same entity kind the later one
    /// fails its create-only write. Give one of them a remote address to keep both.
    pub async fn export_all(&self, providers: &[Provider], stop: i64) -> Vec<ExportReport> {
        for path in self.shared_output_paths(stop) {
            warn!(
                path = %path.display(),
                "Several enabled exports write the same file; only the first will succeed"
            );
        }

        let mut reports = Vec::with_capacity(SchemaVariant::ALL.len() * EntityKind::ALL.len());
        for variant in SchemaVariant::ALL {
            for kind in EntityKind::ALL {
                reports.push(self.export(variant, kind, providers, stop).await);
            }
        }
        reports
    }

    /// Local output files claimed by more than one enabled export
    pub fn shared_output_paths(&self, stop: i64) -> Vec<PathBuf> {
        let mut seen = Vec::new();
        let mut shared = Vec::new();
        for variant in SchemaVariant::ALL {
            for kind in EntityKind::ALL {
                let options = self.options(variant, kind);
                if !options.enabled || options.remote_url.is_some() {
                    continue;
                }
                let path = options.output_path(stop);
                if seen.contains(&path) {
                    if !shared.contains(&path) {
                        shared.push(path);
                    }
                } else {
                    seen.push(path);
                }
            }
        }
        shared
    }

    async fn export(
        &self,
        variant: SchemaVariant,
        kind: EntityKind,
        providers: &[Provider],
        stop: i64,
    ) -> ExportReport {
        let options = self.options(variant, kind);
        if !options.enabled {
            debug!(variant = %variant, kind = %kind, "Export disabled");
            return ExportReport::Disabled { variant, kind };
        }

        let builder = variant.builder();
        let mut bundle = match kind {
            EntityKind::Hospital => {
                build_provider_directory(providers, builder, options.bundle_type)
            }
            EntityKind::Practitioner => {
                build_practitioner_directory(providers, builder, options.bundle_type)
            }
        };
        if options.rewrite_references {
            apply_dummy_reference_rewrite(&mut bundle, variant.rewrite_support());
        }
        let records = bundle.len();

        let outcome = match serialize(&bundle) {
            Ok(text) => {
                self.dispatcher
                    .dispatch(&text, &options.delivery_plan(stop))
                    .await
            }
            Err(e) => {
                error!(variant = %variant, kind = %kind, error = %e, "Failed to serialize bundle");
                DeliveryOutcome::Failed {
                    stage: DeliveryStage::Serialize,
                    cause: e.to_string(),
                }
            }
        };

        info!(
            variant = %variant,
            kind = %kind,
            records,
            failed = outcome.is_failure(),
            "Directory export finished"
        );
        ExportReport::Completed {
            variant,
            kind,
            records,
            outcome,
        }
    }
}
