//! Blocking client core for the Jamf Pro API.
//!
//! # Overview
//! Turns logical requests into authenticated HTTP calls against one Jamf Pro
//! instance, classifies and decodes the answers, and hides the backend's
//! eventual consistency by polling after every mutation until the change is
//! observable.
//!
//! # Design
//! - `Session` owns the bearer credential and the load-balancer affinity
//!   cookie. All clones of a `JamfClient` share one session.
//! - `encode` and `dispatch` are pure functions over the plain
//!   `HttpRequest` / `HttpResponse` values; only the `Transport` touches the
//!   network, so everything above it is testable with a scripted stub.
//! - `Reconciler` implements the read-after-write loops. Its sleeps go
//!   through a `Sleeper` and observe a `CancelToken`.
//! - `resources` holds the typed services (computer groups, computers,
//!   categories) that map operations onto path templates.

pub mod cancel;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod http;
pub mod reconcile;
pub mod resources;
pub mod session;

#[cfg(test)]
mod testing;

pub use cancel::{CancelToken, Sleeper, ThreadSleeper};
pub use client::JamfClient;
pub use config::{ClientConfig, ReconcileConfig};
pub use dispatch::Response;
pub use encode::{ContentType, RequestDescriptor};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use reconcile::{ReconcilePolicy, Reconciler};
pub use session::{AffinityCookie, Session};
