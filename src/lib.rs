//! GENISI Relay is the backend half of a bilingual chat product: it accepts
//! `{ mode, prompt }` requests and always answers with `{ reply }`, whatever
//! the upstream services are doing.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns configuration, mode → model resolution, the dispatch core
//!   that talks to the upstream tiers, and outcome metrics.
//! - [`server`] exposes the relay over HTTP (chat, health, and metrics
//!   routes) with an always-200 chat contract.
//! - [`api`] defines the wire payloads for the relay route and for both
//!   upstream response shapes.
//! - [`cli`] parses command-line arguments and sequences startup.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::run`], which loads configuration, builds the
//! [`core::dispatch::Dispatcher`], and hands it to [`server::serve`].

pub mod api;
pub mod cli;
pub mod core;
pub mod server;
pub mod utils;
