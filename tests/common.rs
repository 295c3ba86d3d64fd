//! Shared test doubles for the integration tests.
//!
//! - [`RecordingGenerator`] - scripted inference replies, records prompts
//! - [`RecordingStore`] - memory store that counts calls and injects failures
//! - [`PagedStore`] - fixed pages keyed by cursor, records visited cursors
//! - [`TestApp`] - router wired to the doubles, driven with `oneshot`

#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use pixgate::clock::FixedClock;
use pixgate::http::{AppState, HandlerConfig, router};
use pixgate::inference::ImageGenerator;
use pixgate::storage::{ListPage, MemoryStore, ObjectStore, PutOptions};

pub const NOW: i64 = 1_700_000_000_000;
pub const DAY: i64 = 24 * 60 * 60 * 1000;
pub const BASE_URL: &str = "https://assets.example.com";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// What the generator answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Image(Bytes),
    Nothing,
    Fail(String),
}

pub struct RecordingGenerator {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn image() -> Self {
        Self::new(Reply::Image(Bytes::from_static(PNG)))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<Option<Bytes>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Image(bytes) => Ok(Some(bytes.clone())),
            Reply::Nothing => Ok(None),
            Reply::Fail(message) => bail!("{message}"),
        }
    }
}

/// [`MemoryStore`] wrapper counting calls, with switchable failures.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    puts: AtomicUsize,
    lists: AtomicUsize,
    deletes: AtomicUsize,
    fail_puts: AtomicBool,
    fail_deletes: Mutex<HashSet<String>>,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, key: &str) {
        self.fail_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            bail!("bucket unavailable");
        }
        self.inner.put(key, data, options).await
    }

    async fn list(&self, cursor: Option<&str>) -> Result<ListPage> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(cursor).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.lock().unwrap().contains(key) {
            bail!("delete of {key} refused");
        }
        self.inner.delete(key).await
    }
}

/// Store serving fixed pages; the first page is registered under `None`.
///
/// A cursor with no registered page makes `list` fail.
#[derive(Default)]
pub struct PagedStore {
    pages: HashMap<Option<String>, ListPage>,
    cursors: Mutex<Vec<Option<String>>>,
    deleted: Mutex<Vec<String>>,
}

impl PagedStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, cursor: Option<&str>, page: ListPage) -> Self {
        self.pages.insert(cursor.map(str::to_string), page);
        self
    }

    pub fn cursors(&self) -> Vec<Option<String>> {
        self.cursors.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for PagedStore {
    async fn put(&self, _key: &str, _data: Bytes, _options: PutOptions) -> Result<()> {
        bail!("read-only store")
    }

    async fn list(&self, cursor: Option<&str>) -> Result<ListPage> {
        let cursor = cursor.map(str::to_string);
        self.cursors.lock().unwrap().push(cursor.clone());
        match self.pages.get(&cursor) {
            Some(page) => Ok(page.clone()),
            None => bail!("no page for cursor {cursor:?}"),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

/// Response collected into memory.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Router wired to recording doubles and a fixed clock.
pub struct TestApp {
    pub generator: Arc<RecordingGenerator>,
    pub store: Arc<RecordingStore>,
    pub clock: Arc<FixedClock>,
    pub base_url: String,
}

impl TestApp {
    pub fn new(generator: RecordingGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            store: Arc::new(RecordingStore::default()),
            clock: Arc::new(FixedClock::new(NOW)),
            base_url: BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            HandlerConfig {
                public_base_url: self.base_url.clone(),
            },
            self.generator.clone(),
            self.store.clone(),
            self.clock.clone(),
        )
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = router(self.state())
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, body: &str) -> TestResponse {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn method(&self, method: &str, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}
