// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! crewplane Rust SDK
//!
//! Everything a worker agent needs to join a control plane: register,
//! keep a heartbeat loop alive, publish events and hand tasks off.
//!
//! ```no_run
//! use crewplane_sdk::{CrewplaneClient, HeartbeatLoop, RegistrationRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let client = CrewplaneClient::new("http://localhost:8000");
//! let registration = RegistrationRequest {
//!     name: "qa-engineer".to_string(),
//!     role: "qa_engineer".to_string(),
//!     version: "1.0.0".to_string(),
//!     capabilities: vec!["pytest".to_string()],
//!     topics: vec![],
//!     health_url: "http://qa-engineer:8005/health".to_string(),
//!     dedup_key: "qa-engineer@host-a".to_string(),
//! };
//! let cancel = CancellationToken::new();
//! tokio::spawn(HeartbeatLoop::new(client, registration).run(cancel.clone()));
//! # }
//! ```

pub mod client;
pub mod heartbeat;
pub mod types;

pub use client::{ClientError, CrewplaneClient};
pub use heartbeat::{HeartbeatConfig, HeartbeatLoop, TickOutcome};
pub use types::*;
