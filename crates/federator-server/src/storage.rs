//! Builds the configured [`StorageBackend`] this producer reads
//! source files from for `StreamFiles`.

use anyhow::{bail, Context};
use federator_storage::backend::azure::AzureProvider;
use federator_storage::backend::gcs::GcsProvider;
use federator_storage::backend::local::LocalProvider;
use federator_storage::backend::s3::S3Provider;
use federator_storage::StorageBackend;

use crate::config::ServerArgs;

pub async fn build_storage(args: &ServerArgs) -> anyhow::Result<StorageBackend> {
    match args.storage_provider.to_ascii_uppercase().as_str() {
        "LOCAL" => Ok(StorageBackend::Local(
            LocalProvider::new(args.local_storage_root.clone()),
            federator_storage::backend::local::LocalReceivedFileStorage,
        )),
        "S3" => {
            let bucket = args
                .s3_bucket
                .clone()
                .context("files.s3.bucket is required when files.storage.provider=s3")?;
            let sdk_config = aws_config::load_from_env().await;
            let client = aws_sdk_s3::Client::new(&sdk_config);
            Ok(StorageBackend::S3(
                S3Provider::new(client.clone(), bucket.clone()),
                federator_storage::backend::s3::S3ReceivedFileStorage::new(client, bucket),
            ))
        }
        "AZURE" => {
            bail!("azure storage provider requires a ContainerClient built by the deployment's own credential plumbing; wire AzureProvider::new/AzureReceivedFileStorage::new from main for your environment")
        }
        "GCS" => {
            let container = args
                .gcs_bucket
                .clone()
                .context("gcp.storage.bucket is required when files.storage.provider=gcs")?;
            let client_config = google_cloud_storage::client::ClientConfig::default()
                .with_auth()
                .await
                .context("loading GCS credentials")?;
            let client = google_cloud_storage::client::Client::new(client_config);
            Ok(StorageBackend::Gcs(
                GcsProvider::new(client.clone(), container.clone()),
                federator_storage::backend::gcs::GcsReceivedFileStorage::new(client, container),
            ))
        }
        other => bail!("unknown files.storage.provider `{other}` (expected local, s3, azure or gcs)"),
    }
}
