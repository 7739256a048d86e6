//! # flowprobe HTTP client
//!
//! [`ReqwestClient`] implements [`flowprobe_core::HttpClient`] on top of
//! `reqwest`, so workflows can run against a live service.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowprobe_core::{SequentialWorkflowRunner, Seeder, WorkflowSpec};
//! use flowprobe_http::ReqwestClient;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ReqwestClient::builder()
//!     .base_url("https://stage-api.example.com")
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let workflow = WorkflowSpec::load("flows/ecare_booking.toml")?;
//! let context = Seeder::default().seed(&workflow, &BTreeMap::new())?;
//!
//! let runner = SequentialWorkflowRunner::new(Arc::new(client));
//! let report = runner.run(&workflow, context).await?;
//! println!("passed: {}", report.passed());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{ReqwestClient, ReqwestClientBuilder};
pub use config::ClientConfig;
pub use error::{HttpError, HttpResult};
