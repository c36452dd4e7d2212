//! # SwipeFeed
//!
//! The ingestion and reconciliation core of an RSS/Atom reader.
//!
//! ## Architecture
//!
//! ```text
//! URL → Transport → Parser → Normalizer → ReconcileEngine → Store
//! ```
//!
//! - [`fetcher`]: document transport with direct and proxy-chain variants
//! - [`parser`]: RSS 2.0 / Atom parsing into an intermediate representation
//! - [`normalizer`]: raw items → canonical articles (cleaning, stable ids)
//! - [`engine`]: deduplicating merge, flag transitions, bulk refresh, retention
//! - [`store`]: SQLite persistence
//!
//! UI concerns live outside this crate; the bundled CLI is a thin collaborator
//! that supplies feed URLs and invokes the per-article state mutations.

/// Application context (DI wiring) and error types.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration from `~/.config/swipefeed/config.toml`.
pub mod config;

/// Core domain models: [`Feed`](domain::Feed) and [`Article`](domain::Article)
/// with deterministic, fetch-stable identifiers.
pub mod domain;

/// Reconciliation engine: merges fetched batches into the store without
/// duplication or flag loss, with bounded-concurrency bulk refresh.
pub mod engine;

/// Document transports.
///
/// - [`Transport`](fetcher::Transport): async fetch capability
/// - [`DirectTransport`](fetcher::DirectTransport): plain reqwest fetch
/// - [`ProxiedTransport`](fetcher::ProxiedTransport): ordered relay fallback
pub mod fetcher;

/// Feed text cleanup and canonical article construction.
pub mod normalizer;

/// RSS/Atom dialect handling on top of feed-rs.
pub mod parser;

/// SQLite persistence layer.
pub mod store;
