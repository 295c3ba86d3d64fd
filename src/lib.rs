//! pixgate - prompt-to-image proxy.
//!
//! Two entry points share one object store:
//!
//! - the request handler ([`http::router`]) turns a prompt into a PNG via an
//!   [`inference::ImageGenerator`], stores it under `images/{millis}-{token}.png`
//!   with a `createdAt` metadata field, and answers `{"imageUrl": ...}`
//! - the retention sweeper ([`sweeper::RetentionSweeper`]) deletes assets
//!   whose `createdAt` is older than the retention window
//!
//! Collaborators (generator, store, clock) are traits so both entry points
//! can be driven with doubles in tests.

pub mod asset;
pub mod clock;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod inference;
pub mod logging;
pub mod scheduler;
pub mod storage;
pub mod sweeper;

pub use asset::AssetKey;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use http::{AppState, GenerateResponse, HandlerConfig, generate_image, router};
pub use inference::{ImageGenerator, WorkersAiGenerator};
pub use storage::{ObjectStore, open_store};
pub use sweeper::{RetentionConfig, RetentionSweeper, SweepReport};
