//! # docdrop
//!
//! An upload metadata service backed by a document store, and a small
//! question-answering client.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌───────────┐   ┌─────────────────┐
//! │   hosting    │──▶│  server  │──▶│  upload   │──▶│ store::pool     │
//! │ listen/embed │   │  (axum)  │   │ (records) │   │ shared/per-req  │
//! └──────────────┘   └──────────┘   └───────────┘   └───────┬─────────┘
//!                                                          ▼
//!                                          ┌──────────────────────────┐
//!                                          │ MongoDB / SQLite / memory │
//!                                          └──────────────────────────┘
//!
//! ┌──────────┐   ┌───────────┐   ┌──────────┐
//! │  prompt  │──▶│  session  │   │   ask    │──▶ POST {ASK_API_URL}/ask
//! │  (CLI)   │──────────────────▶│ (client) │    or local placeholder
//! └──────────┘   └───────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Upload record |
//! | [`store`] | Document store trait, backends and connection pool |
//! | [`migrate`] | SQLite schema |
//! | [`upload`] | Record construction and insertion |
//! | [`server`] | HTTP routes |
//! | [`hosting`] | Listening and embedded adapters |
//! | [`ask`] | Question client |
//! | [`session`] | Question/answer state |
//! | [`prompt`] | Terminal front for the question client |

pub mod ask;
pub mod config;
pub mod hosting;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod server;
pub mod session;
pub mod store;
pub mod upload;
