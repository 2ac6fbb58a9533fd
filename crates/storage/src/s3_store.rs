//! Object storage backend for the S3 and S3-Disk targets.
//!
//! ClickHouse writes an unsuffixed backup as many objects under one prefix,
//! so an artifact here is a first-level "directory" below the configured
//! path. Deleting an artifact removes every object under it.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use clickhouse_backup_core::S3Location;
use tracing::debug;

use crate::store::ArtifactStore;

pub struct S3Store {
    client: Client,
    bucket: String,
    /// Listing prefix, either empty or ending in `/`.
    root: String,
}

impl S3Store {
    pub async fn connect(location: &S3Location) -> Result<Self> {
        let credentials = Credentials::new(
            &location.access_key_id,
            &location.secret_access_key,
            None,
            None,
            "clickhouse-backup",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(location.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        debug!(endpoint = %location.endpoint, bucket = %location.bucket, "using S3 endpoint");
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(&location.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: location.bucket.clone(),
            root: location
                .prefix()
                .map(|p| format!("{p}/"))
                .unwrap_or_default(),
        })
    }

    async fn keys_under(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }
            let resp = request
                .send()
                .await
                .with_context(|| format!("list s3://{}/{prefix}", self.bucket))?;

            keys.extend(resp.contents.unwrap_or_default().into_iter().filter_map(|o| o.key));
            match resp.next_continuation_token {
                Some(token) if resp.is_truncated == Some(true) => continuation_token = Some(token),
                _ => break,
            }
        }
        Ok(keys)
    }
}

#[async_trait::async_trait]
impl ArtifactStore for S3Store {
    async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.root)
                .delimiter("/");
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }
            let resp = request
                .send()
                .await
                .with_context(|| format!("list {}", self.describe()))?;

            let prefixes = resp
                .common_prefixes
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| p.prefix);
            let objects = resp
                .contents
                .unwrap_or_default()
                .into_iter()
                .filter_map(|o| o.key);
            for key in prefixes.chain(objects) {
                let name = key
                    .strip_prefix(&self.root)
                    .unwrap_or(&key)
                    .trim_end_matches('/');
                if !name.is_empty() {
                    names.push(name.to_owned());
                }
            }

            match resp.next_continuation_token {
                Some(token) if resp.is_truncated == Some(true) => continuation_token = Some(token),
                _ => break,
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let key = format!("{}{name}", self.root);
        let mut keys = self.keys_under(&format!("{key}/")).await?;
        keys.extend(self.keys_under(&key).await?.into_iter().filter(|k| *k == key));
        anyhow::ensure!(!keys.is_empty(), "s3://{}/{key} does not exist", self.bucket);

        for object in &keys {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(object)
                .send()
                .await
                .with_context(|| format!("delete s3://{}/{object}", self.bucket))?;
        }
        debug!(artifact = name, objects = keys.len(), "deleted object storage artifact");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.root)
    }
}
