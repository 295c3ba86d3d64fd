//! S3-compatible storage backend (AWS S3, Cloudflare R2, MinIO).
//!
//! User metadata is not part of a ListObjectsV2 response, so `list` issues a
//! HEAD per listed key. A HEAD that fails yields an object without metadata,
//! which the sweeper skips.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, warn};

use super::backend::ObjectStore;
use super::types::{ListPage, ListedObject, Metadata, PutOptions};
use super::validation::validate_key;

/// Connection settings for [`S3Store`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Upper bound on keys per list call (S3 caps this at 1000)
    pub page_size: i32,
}

/// S3-backed object store.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    page_size: i32,
}

impl S3Store {
    /// Builds a client from the ambient AWS configuration (environment,
    /// profile) plus the given overrides.
    pub async fn connect(settings: S3Settings) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(Client::from_conf(builder.build()), settings.bucket, settings.page_size)
    }

    pub fn from_client(client: Client, bucket: impl Into<String>, page_size: i32) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            page_size: page_size.clamp(1, 1000),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_metadata(&self, key: &str) -> Option<Metadata> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => head
                .metadata
                .map(|metadata| metadata.into_iter().collect::<Metadata>()),
            Err(e) => {
                warn!(bucket = %self.bucket, %key, error = %e, "S3 head failed, treating metadata as absent");
                None
            },
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        let key = validate_key(key)?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(options.content_type)
            .body(ByteStream::from(data));
        for (name, value) in options.metadata {
            request = request.metadata(name, value);
        }

        request
            .send()
            .await
            .with_context(|| format!("S3 put failed: {key}"))?;

        debug!(bucket = %self.bucket, %key, "Put object to S3");
        Ok(())
    }

    async fn list(&self, cursor: Option<&str>) -> Result<ListPage> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(self.page_size)
            .set_continuation_token(cursor.map(str::to_string))
            .send()
            .await
            .context("S3 list failed")?;

        let mut objects = Vec::new();
        for object in response.contents.unwrap_or_default() {
            let Some(key) = object.key else {
                continue;
            };
            let metadata = self.head_metadata(&key).await;
            objects.push(ListedObject { key, metadata });
        }

        let cursor = if response.is_truncated.unwrap_or(false) {
            response.next_continuation_token
        } else {
            None
        };

        debug!(bucket = %self.bucket, count = objects.len(), more = cursor.is_some(), "Listed objects from S3");
        Ok(ListPage { objects, cursor })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("S3 delete failed: {key}"))?;

        debug!(bucket = %self.bucket, %key, "Deleted object from S3");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::created_at_metadata;
    use crate::clock::FixedClock;
    use crate::sweeper::{RetentionConfig, RetentionSweeper};
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use axum::Router;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, put};
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    const NOW: i64 = 1_700_000_000_000;
    const DAY: i64 = 24 * 60 * 60 * 1000;

    #[derive(Debug, Clone, Default)]
    struct FakeObject {
        content_type: Option<String>,
        metadata: BTreeMap<String, String>,
    }

    /// Path-style S3 bucket: ListObjectsV2, PUT, HEAD and DELETE.
    #[derive(Default)]
    struct FakeBucket {
        objects: Mutex<BTreeMap<String, FakeObject>>,
        /// Keys that are listed but whose HEAD answers 404
        hidden: Mutex<HashSet<String>>,
        tokens: Mutex<Vec<Option<String>>>,
    }

    impl FakeBucket {
        fn insert(&self, key: &str, metadata: Metadata) {
            self.objects.lock().unwrap().insert(
                key.to_string(),
                FakeObject {
                    content_type: Some("image/png".to_string()),
                    metadata: metadata
                        .into_iter()
                        .map(|(name, value)| (name.to_ascii_lowercase(), value))
                        .collect(),
                },
            );
        }

        fn hide(&self, key: &str) {
            self.hidden.lock().unwrap().insert(key.to_string());
        }

        fn get(&self, key: &str) -> Option<FakeObject> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }
    }

    async fn list_objects(
        State(bucket): State<Arc<FakeBucket>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let max_keys = params
            .get("max-keys")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(1000);
        let token = params.get("continuation-token").cloned();
        bucket.tokens.lock().unwrap().push(token.clone());

        let keys: Vec<String> = bucket
            .keys()
            .into_iter()
            .filter(|key| token.as_deref().is_none_or(|token| key.as_str() > token))
            .collect();
        let truncated = keys.len() > max_keys;
        let page = &keys[..keys.len().min(max_keys)];

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>test-bucket</Name>"#,
        );
        xml.push_str(&format!(
            "<KeyCount>{}</KeyCount><MaxKeys>{max_keys}</MaxKeys><IsTruncated>{truncated}</IsTruncated>",
            page.len()
        ));
        if truncated && let Some(last) = page.last() {
            xml.push_str(&format!("<NextContinuationToken>{last}</NextContinuationToken>"));
        }
        for key in page {
            xml.push_str(&format!("<Contents><Key>{key}</Key><Size>1</Size></Contents>"));
        }
        xml.push_str("</ListBucketResult>");

        ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
    }

    async fn put_object(
        State(bucket): State<Arc<FakeBucket>>,
        Path((_bucket, key)): Path<(String, String)>,
        headers: HeaderMap,
    ) -> StatusCode {
        let metadata = headers
            .iter()
            .filter_map(|(name, value)| {
                let field = name.as_str().strip_prefix("x-amz-meta-")?;
                Some((field.to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        bucket.objects.lock().unwrap().insert(
            key,
            FakeObject {
                content_type,
                metadata,
            },
        );
        StatusCode::OK
    }

    async fn head_object(
        State(bucket): State<Arc<FakeBucket>>,
        Path((_bucket, key)): Path<(String, String)>,
    ) -> Response {
        if bucket.hidden.lock().unwrap().contains(&key) {
            return StatusCode::NOT_FOUND.into_response();
        }
        let Some(object) = bucket.get(&key) else {
            return StatusCode::NOT_FOUND.into_response();
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &object.metadata {
            headers.insert(
                HeaderName::from_bytes(format!("x-amz-meta-{name}").as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        (StatusCode::OK, headers).into_response()
    }

    async fn delete_object(
        State(bucket): State<Arc<FakeBucket>>,
        Path((_bucket, key)): Path<(String, String)>,
    ) -> StatusCode {
        bucket.objects.lock().unwrap().remove(&key);
        StatusCode::NO_CONTENT
    }

    async fn fake_store(bucket: Arc<FakeBucket>, page_size: i32) -> S3Store {
        let router = Router::new()
            .route("/{bucket}", get(list_objects))
            .route("/{bucket}/", get(list_objects))
            .route(
                "/{bucket}/{*key}",
                put(put_object).head(head_object).delete(delete_object),
            )
            .with_state(bucket);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "static"))
            .endpoint_url(format!("http://{addr}"))
            .force_path_style(true)
            .build();

        S3Store::from_client(Client::from_conf(config), "test-bucket", page_size)
    }

    #[tokio::test]
    async fn test_put_writes_metadata_and_content_type() {
        let bucket = Arc::new(FakeBucket::default());
        let store = fake_store(bucket.clone(), 1000).await;

        store
            .put(
                "images/a.png",
                Bytes::from_static(b"png"),
                PutOptions::new("image/png").with_metadata(created_at_metadata(1234)),
            )
            .await
            .unwrap();

        let object = bucket.get("images/a.png").expect("object stored");
        assert_eq!(object.content_type.as_deref(), Some("image/png"));
        assert_eq!(object.metadata.get("createdat").map(String::as_str), Some("1234"));
    }

    #[tokio::test]
    async fn test_created_at_survives_round_trip() {
        let bucket = Arc::new(FakeBucket::default());
        let store = fake_store(bucket, 1000).await;

        store
            .put(
                "images/a.png",
                Bytes::from_static(b"png"),
                PutOptions::new("image/png").with_metadata(created_at_metadata(1234)),
            )
            .await
            .unwrap();

        let page = store.list(None).await.unwrap();
        assert_eq!(page.objects.len(), 1);
        let metadata = page.objects[0].metadata.as_ref().expect("metadata from HEAD");
        assert_eq!(crate::asset::created_at_from(metadata), Some(1234));
    }

    #[tokio::test]
    async fn test_list_follows_continuation_tokens() {
        let bucket = Arc::new(FakeBucket::default());
        for key in ["images/a.png", "images/b.png", "images/c.png"] {
            bucket.insert(key, created_at_metadata(NOW));
        }
        let store = fake_store(bucket.clone(), 2).await;

        let first = store.list(None).await.unwrap();
        assert_eq!(first.objects.len(), 2);
        let cursor = first.next_cursor().expect("truncated first page").to_string();

        let second = store.list(Some(&cursor)).await.unwrap();
        assert_eq!(second.objects.len(), 1);
        assert_eq!(second.objects[0].key, "images/c.png");
        assert_eq!(second.cursor, None);

        assert_eq!(
            *bucket.tokens.lock().unwrap(),
            [None, Some("images/b.png".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_head_yields_no_metadata() {
        let bucket = Arc::new(FakeBucket::default());
        bucket.insert("images/a.png", created_at_metadata(NOW - 30 * DAY));
        bucket.hide("images/a.png");
        let store = fake_store(bucket, 1000).await;

        let page = store.list(None).await.unwrap();

        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0].metadata, None);
    }

    #[tokio::test]
    async fn test_sweep_over_s3() {
        let bucket = Arc::new(FakeBucket::default());
        bucket.insert("images/old.png", created_at_metadata(NOW - 8 * DAY));
        bucket.insert("images/new.png", created_at_metadata(NOW - DAY));
        bucket.insert("images/unknown.png", created_at_metadata(NOW - 30 * DAY));
        bucket.insert("images/zzz.png", created_at_metadata(NOW - 9 * DAY));
        bucket.hide("images/unknown.png");
        let store = fake_store(bucket.clone(), 2).await;

        let sweeper = RetentionSweeper::new(
            Arc::new(store),
            Arc::new(FixedClock::new(NOW)),
            RetentionConfig::default(),
        );
        let report = sweeper.run().await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.deleted, ["images/old.png", "images/zzz.png"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(bucket.keys(), ["images/new.png", "images/unknown.png"]);
    }
}
