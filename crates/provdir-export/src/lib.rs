//! Provider and practitioner directory export.
//!
//! A directory export filters the population down to providers and clinicians
//! that saw encounters, builds a bundle of variant-shaped records annotated with
//! utilization extensions, optionally rewrites entry references to a placeholder
//! server, serializes it and hands the text to a single sink.
//!
//! ```text
//! Settings -> usage + eligibility -> builder -> rewrite -> serialize -> SinkDispatcher
//! ```

pub mod builder;
pub mod bundle;
pub mod error;
pub mod exporter;
pub mod rewrite;
pub mod serialize;
pub mod sink;
pub mod usage;
pub mod variant;
mod variants;

pub use builder::{build_practitioner_directory, build_provider_directory};
pub use bundle::{
    BundleEntry, BundleType, EntryRequest, ExportBundle, Extension, HttpVerb, Record, RecordKind,
};
pub use error::{DeliveryError, ExportError, Result};
pub use exporter::{DirectoryExporter, ExportOptions, ExportReport};
pub use rewrite::apply_dummy_reference_rewrite;
pub use serialize::serialize;
pub use sink::{DeliveryOutcome, DeliveryPlan, DeliveryStage, SinkDispatcher, UploadOutcome};
pub use usage::{clinician_eligible, provider_eligible, totals_for};
pub use variant::{EntityKind, RecordBuilder, RewriteSupport, SchemaVariant};
pub use variants::{Dstu2Builder, R4Builder, Stu3Builder};
