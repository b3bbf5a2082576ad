use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use provdir_config::{Settings, SettingsLoader, keys};
use provdir_core::{Clinician, Metric, Provider, Utilization};
use provdir_export::sink::{
    HttpRemoteSink, LocalOutputStore, ObjectUploader, OutputStore, S3Target, S3Uploader,
};
use provdir_export::{
    DeliveryError, DeliveryOutcome, DeliveryPlan, DeliveryStage, DirectoryExporter, EntityKind,
    ExportReport, SchemaVariant, SinkDispatcher, UploadOutcome,
};
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "http://synthetichealth.github.io/synthea/";

fn population() -> Vec<Provider> {
    let busy = Provider::new("prov-1", "Bedford General")
        .with_utilization(
            Utilization::new()
                .with(0, Metric::Encounters, 5)
                .with(1, Metric::Encounters, 3)
                .with(0, Metric::Procedures, 2),
        )
        .with_clinician(
            Clinician::new("clin-1", "Ann", "Lee", "GENERAL PRACTICE").with_encounter_count(4),
        )
        .with_clinician(Clinician::new("clin-2", "Bo", "Kim", "CARDIOLOGY"));
    let idle = Provider::new("prov-2", "Quiet Clinic")
        .with_bed_count(10)
        .with_clinician(
            Clinician::new("clin-3", "Cy", "Ng", "GENERAL PRACTICE").with_encounter_count(7),
        );
    vec![busy, idle]
}

/// Packaged defaults with the output directory moved into a temp dir
fn settings(out: &Path) -> Settings {
    let empty_root = TempDir::new().unwrap();
    SettingsLoader::new()
        .with_search_root(empty_root.path())
        .load()
        .unwrap()
        .with_override(keys::BASE_DIRECTORY, out.display().to_string())
}

fn exporter(settings: Settings) -> DirectoryExporter {
    DirectoryExporter::from_settings(Arc::new(settings)).unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn extension_values(resource: &Value) -> Vec<(String, u64)> {
    resource["extension"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ext| {
            (
                ext["url"].as_str().unwrap().to_string(),
                ext["valueInteger"].as_u64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_end_to_end_local_write() {
    let out = TempDir::new().unwrap();
    let exporter = exporter(settings(out.path()));
    let providers = population();

    let report = exporter
        .export_organizations(SchemaVariant::R4, &providers, 42)
        .await;
    let path = out.path().join("fhir").join("hospitalInformation42.json");
    assert_eq!(
        report,
        ExportReport::Completed {
            variant: SchemaVariant::R4,
            kind: EntityKind::Hospital,
            records: 1,
            outcome: DeliveryOutcome::Written { path: path.clone() },
        }
    );

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with("}\n"));
    let bundle = read_json(&path);
    assert_eq!(bundle["type"], "batch");
    let entries = bundle["entry"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["fullUrl"], "urn:uuid:prov-1");
    assert_eq!(
        extension_values(&entries[0]["resource"]),
        vec![
            (format!("{BASE}utilization-encounters-extension"), 8),
            (format!("{BASE}utilization-procedures-extension"), 2),
            (format!("{BASE}utilization-labs-extension"), 0),
            (format!("{BASE}utilization-prescriptions-extension"), 0),
        ]
    );

    let report = exporter
        .export_practitioners(SchemaVariant::R4, &providers, 42)
        .await;
    assert!(!report.outcome().unwrap().is_failure());

    let bundle = read_json(&out.path().join("fhir").join("practitionerInformation42.json"));
    let entries = bundle["entry"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["resource"]["id"], "clin-1");
    assert_eq!(
        extension_values(&entries[0]["resource"]),
        vec![(format!("{BASE}utilization-encounters-extension"), 4)]
    );
}

#[tokio::test]
async fn test_second_export_with_same_stop_does_not_overwrite() {
    let out = TempDir::new().unwrap();
    let exporter = exporter(settings(out.path()));
    let providers = population();

    let first = exporter
        .export_organizations(SchemaVariant::R4, &providers, 7)
        .await;
    assert!(!first.outcome().unwrap().is_failure());
    let path = out.path().join("fhir").join("hospitalInformation7.json");
    let before = fs::read_to_string(&path).unwrap();

    let second = exporter
        .export_organizations(SchemaVariant::R4, &[], 7)
        .await;
    assert!(matches!(
        second.outcome(),
        Some(DeliveryOutcome::Failed {
            stage: DeliveryStage::LocalWrite,
            ..
        })
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[tokio::test]
async fn test_reference_rewrite_per_variant() {
    let out = TempDir::new().unwrap();
    let settings = settings(out.path())
        .with_override("exporter.hospital.fhir_stu3.export", "true")
        .with_override(&SchemaVariant::R4.exclude_resources_key(), "true")
        .with_override(&SchemaVariant::Stu3.exclude_resources_key(), "TRUE");
    let exporter = exporter(settings);
    let providers = population();

    exporter
        .export_organizations(SchemaVariant::R4, &providers, 1)
        .await;
    let r4 = read_json(&out.path().join("fhir").join("hospitalInformation1.json"));
    let entry = &r4["entry"][0];
    assert_eq!(entry["fullUrl"], "http://synthea-dummy/fhir/Organization/prov-1");
    assert_eq!(entry["request"]["method"], "PUT");
    assert_eq!(entry["request"]["url"], "Organization/prov-1");

    // STU3 shares the "fhir" folder, so use a different stop value.
    exporter
        .export_organizations(SchemaVariant::Stu3, &providers, 2)
        .await;
    let stu3 = read_json(&out.path().join("fhir").join("hospitalInformation2.json"));
    let entry = &stu3["entry"][0];
    assert_eq!(stu3["type"], "transaction");
    assert_eq!(entry["fullUrl"], "http://synthea-dummy/fhir/Organization/prov-1");
    assert_eq!(entry["request"]["method"], "POST");
    assert_eq!(entry["request"]["url"], "Organization");
}

#[tokio::test]
async fn test_collection_bundle_without_rewrite() {
    let out = TempDir::new().unwrap();
    let settings = settings(out.path()).with_override(keys::TRANSACTION_BUNDLE, "false");
    let exporter = exporter(settings);

    exporter
        .export_organizations(SchemaVariant::R4, &population(), 3)
        .await;
    let bundle = read_json(&out.path().join("fhir").join("hospitalInformation3.json"));
    assert_eq!(bundle["type"], "collection");
    assert_eq!(bundle["entry"][0]["fullUrl"], "urn:uuid:prov-1");
    assert!(bundle["entry"][0].get("request").is_none());
}

#[tokio::test]
async fn test_remote_push_skips_local_write() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let settings =
        settings(out.path()).with_override(&SchemaVariant::R4.target_url_key(), server.uri());
    let report = exporter(settings)
        .export_organizations(SchemaVariant::R4, &population(), 5)
        .await;

    assert_eq!(
        report.outcome(),
        Some(&DeliveryOutcome::Pushed { url: server.uri() })
    );
    assert!(!out.path().join("fhir").exists());

    let requests = server.received_requests().await.unwrap();
    let pushed: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(pushed["resourceType"], "Bundle");
    assert_eq!(pushed["entry"][0]["resource"]["id"], "prov-1");
}

#[tokio::test]
async fn test_remote_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let settings =
        settings(out.path()).with_override(&SchemaVariant::R4.target_url_key(), server.uri());
    let report = exporter(settings)
        .export_practitioners(SchemaVariant::R4, &population(), 5)
        .await;

    assert!(matches!(
        report.outcome(),
        Some(DeliveryOutcome::Failed {
            stage: DeliveryStage::RemotePush,
            ..
        })
    ));
    assert!(!out.path().join("fhir").exists());
}

/// Store that counts every call and writes nothing
#[derive(Default)]
struct CountingStore {
    calls: AtomicUsize,
}

impl OutputStore for CountingStore {
    fn ensure_dir(&self, _dir: &Path) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write_new(&self, _path: &Path, _text: &str) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write_archive(
        &self,
        path: &Path,
        _text: &str,
    ) -> Result<std::path::PathBuf, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(path.with_extension("json.zip"))
    }
}

#[tokio::test]
async fn test_remote_address_means_zero_filesystem_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let settings = settings(out.path())
        .with_override(&SchemaVariant::R4.target_url_key(), server.uri())
        .with_override(keys::COMPRESS_DATA, "true");
    let store = Arc::new(CountingStore::default());
    let dispatcher = SinkDispatcher::new(
        Arc::new(HttpRemoteSink::new(Duration::from_secs(5)).unwrap()),
        store.clone(),
    );
    let exporter = DirectoryExporter::new(Arc::new(settings), dispatcher);

    let reports = exporter.export_all(&population(), 9).await;

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    let pushed = reports
        .iter()
        .filter(|r| matches!(r.outcome(), Some(DeliveryOutcome::Pushed { .. })))
        .count();
    assert_eq!(pushed, 2);
}

#[derive(Default)]
struct RecordingUploader {
    uploaded: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectUploader for RecordingUploader {
    async fn upload(&self, archive: &Path) -> Result<String, DeliveryError> {
        assert!(archive.exists());
        let key = format!(
            "exports/{}",
            archive.file_name().unwrap().to_string_lossy()
        );
        self.uploaded.lock().unwrap().push(key.clone());
        Ok(key)
    }
}

#[tokio::test]
async fn test_compressed_export_is_uploaded() {
    let out = TempDir::new().unwrap();
    let settings = settings(out.path())
        .with_override(keys::COMPRESS_DATA, "true")
        .with_override(keys::AWS_S3_EXPORT_ENABLED, "true");
    let uploader = Arc::new(RecordingUploader::default());
    let dispatcher = SinkDispatcher::new(
        Arc::new(HttpRemoteSink::new(Duration::from_secs(5)).unwrap()),
        Arc::new(LocalOutputStore::new()),
    )
    .with_uploader(uploader.clone());
    let exporter = DirectoryExporter::new(Arc::new(settings), dispatcher);

    let report = exporter
        .export_organizations(SchemaVariant::R4, &population(), 11)
        .await;

    let archive = out.path().join("fhir").join("hospitalInformation11.json.zip");
    assert_eq!(
        report.outcome(),
        Some(&DeliveryOutcome::Archived {
            path: archive.clone(),
            upload: UploadOutcome::Uploaded {
                key: "exports/hospitalInformation11.json.zip".to_string(),
            },
        })
    );
    assert!(archive.exists());
    assert!(!out.path().join("fhir").join("hospitalInformation11.json").exists());
    assert_eq!(uploader.uploaded.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_export_all_with_defaults() {
    let out = TempDir::new().unwrap();
    let exporter = exporter(settings(out.path()));

    let reports = exporter.export_all(&population(), 0).await;

    assert_eq!(reports.len(), 6);
    let disabled = reports
        .iter()
        .filter(|r| matches!(r, ExportReport::Disabled { .. }))
        .count();
    assert_eq!(disabled, 4);
    assert!(out.path().join("fhir").join("hospitalInformation0.json").exists());
    assert!(out.path().join("fhir").join("practitionerInformation0.json").exists());
    assert!(!out.path().join("fhir_dstu2").exists());
}

#[tokio::test]
async fn test_dstu2_folder_and_bundle_types() {
    let out = TempDir::new().unwrap();
    let settings = settings(out.path())
        .with_override("exporter.hospital.fhir_dstu2.export", "true")
        .with_override("exporter.practitioner.fhir_dstu2.export", "true");
    let exporter = exporter(settings);
    let providers = population();

    exporter
        .export_organizations(SchemaVariant::Dstu2, &providers, 4)
        .await;
    exporter
        .export_practitioners(SchemaVariant::Dstu2, &providers, 4)
        .await;

    let dir = out.path().join("fhir_dstu2");
    assert_eq!(
        read_json(&dir.join("hospitalInformation4.json"))["type"],
        "transaction"
    );
    assert_eq!(
        read_json(&dir.join("practitionerInformation4.json"))["type"],
        "batch"
    );
}

#[tokio::test]
async fn test_upload_timeout_keeps_local_archive() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let target = S3Target {
        bucket: "synthetic".to_string(),
        base_path: "exports".to_string(),
        access_key: "AKIA".to_string(),
        secret_key: "secret".to_string(),
        region: "us-east-1".to_string(),
        timeout: Duration::from_millis(200),
        endpoint_url: Some(server.uri()),
    };
    let dispatcher = SinkDispatcher::new(
        Arc::new(HttpRemoteSink::new(Duration::from_secs(5)).unwrap()),
        Arc::new(LocalOutputStore::new()),
    )
    .with_uploader(Arc::new(S3Uploader::new(target)));
    let plan = DeliveryPlan {
        remote_url: None,
        output_path: out.path().join("fhir").join("hospitalInformation5.json"),
        compress: true,
        upload: true,
    };

    let outcome = dispatcher.dispatch("{}", &plan).await;
    let DeliveryOutcome::Archived { path, upload } = outcome else {
        panic!("expected an archived outcome, got {outcome:?}");
    };
    assert!(path.exists());
    assert!(matches!(upload, UploadOutcome::Failed { ref cause } if cause.contains("timed out")));
}

#[tokio::test]
async fn test_stu3_and_r4_share_the_fhir_folder() {
    let out = TempDir::new().unwrap();
    let settings = settings(out.path())
        .with_override("exporter.hospital.fhir_stu3.export", "true");
    let exporter = exporter(settings);

    let shared = exporter.shared_output_paths(8);
    assert_eq!(
        shared,
        vec![out.path().join("fhir").join("hospitalInformation8.json")]
    );

    let reports = exporter.export_all(&population(), 8).await;
    let failed: Vec<_> = reports
        .iter()
        .filter_map(|r| match r {
            ExportReport::Completed {
                variant,
                outcome: DeliveryOutcome::Failed { stage, cause },
                ..
            } => Some((*variant, *stage, cause.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, SchemaVariant::R4);
    assert_eq!(failed[0].1, DeliveryStage::LocalWrite);
    assert!(failed[0].2.contains("already exists"));
}

#[tokio::test]
async fn test_remote_address_resolves_shared_folder() {
    let out = TempDir::new().unwrap();
    let settings = settings(out.path())
        .with_override("exporter.hospital.fhir_stu3.export", "true")
        .with_override("exporter.fhir_stu3.target_server_base_url", "http://fhir.example/stu3");
    let exporter = exporter(settings);

    assert!(exporter.shared_output_paths(8).is_empty());
}
