//! # Upstream API Client
//!
//! Client for the wrapped Instantly v2 REST API. The tool invoker depends on
//! the [`Upstream`] trait rather than the concrete client, so tests inject a
//! mock without network access.

mod client;

pub use client::{InstantlyClient, Upstream};
