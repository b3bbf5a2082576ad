//! Configuration keys shared by every exporter.
//!
//! Per-variant keys (export flags, target server, reference rewrite) are derived from the
//! variant's key segment by the exporter crate.

pub const BASE_DIRECTORY: &str = "exporter.baseDirectory";

pub const TRANSACTION_BUNDLE: &str = "exporter.fhir.transaction_bundle";

pub const COMPRESS_DATA: &str = "exporter.fhir.allversions.compress_data";

pub const HTTP_TIMEOUT_SECONDS: &str = "exporter.http.timeout_seconds";

pub const AWS_S3_EXPORT_ENABLED: &str = "exporter.aws.s3.export_enabled";
pub const AWS_S3_BUCKET_NAME: &str = "exporter.aws.s3.bucket_name";
pub const AWS_S3_BUCKET_BASE_PATH: &str = "exporter.aws.s3.bucket_base_path";
pub const AWS_S3_ACCESS_KEY: &str = "exporter.aws.s3.aws_access_key";
pub const AWS_S3_SECRET_KEY: &str = "exporter.aws.s3.aws_secret_key";
pub const AWS_S3_REGION: &str = "exporter.aws.s3.region";
pub const AWS_S3_TIMEOUT_SECONDS: &str = "exporter.aws.s3.timeout_seconds";
/// S3-compatible endpoint (e.g. MinIO); blank means AWS endpoint resolution
pub const AWS_S3_ENDPOINT_URL: &str = "exporter.aws.s3.endpoint_url";

/// Keys that must be non-blank once cloud upload is enabled
pub const AWS_S3_REQUIRED: [&str; 4] = [
    AWS_S3_BUCKET_NAME,
    AWS_S3_BUCKET_BASE_PATH,
    AWS_S3_ACCESS_KEY,
    AWS_S3_SECRET_KEY,
];

pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_AWS_S3_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_AWS_S3_REGION: &str = "us-east-1";
pub const DEFAULT_BASE_DIRECTORY: &str = "./output/";
