//! Builds the configured [`StorageBackend`] this tenant publishes
//! assembled files to. Mirrors
//! `federator-server::storage`'s dispatch; kept as its own small copy
//! per binary rather than factored out, since each binary only needs
//! half of `StorageBackend`'s trait surface (`ReceivedFileStorage`
//! here, `FileProvider` on the server) and the two call sites differ
//! in which config fields they read from.

use anyhow::{bail, Context};
use federator_storage::backend::azure::AzureProvider;
use federator_storage::backend::gcs::GcsProvider;
use federator_storage::backend::local::LocalProvider;
use federator_storage::backend::s3::S3Provider;
use federator_storage::StorageBackend;

use crate::config::ClientArgs;

pub async fn build_storage(args: &ClientArgs) -> anyhow::Result<StorageBackend> {
    match args.storage_provider.to_ascii_uppercase().as_str() {
        "LOCAL" => Ok(StorageBackend::Local(
            LocalProvider::new(args.local_storage_root.clone()),
            federator_storage::backend::local::LocalReceivedFileStorage,
        )),
        "S3" => {
            let bucket = args
                .s3_bucket
                .clone()
                .context("files.s3.bucket is required when client.files.storage.provider=s3")?;
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
            let bucket = args
                .gcs_bucket
                .clone()
                .context("gcp.storage.bucket is required when client.files.storage.provider=gcs")?;
            let client_config = google_cloud_storage::client::ClientConfig::default()
                .with_auth()
                .await
                .context("loading GCS credentials")?;
            let client = google_cloud_storage::client::Client::new(client_config);
            Ok(StorageBackend::Gcs(
                GcsProvider::new(client.clone(), bucket.clone()),
                federator_storage::backend::gcs::GcsReceivedFileStorage::new(client, bucket),
            ))
        }
        other => bail!("unknown client.files.storage.provider `{other}` (expected local, s3, azure or gcs)"),
    }
}
