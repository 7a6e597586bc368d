//! # newsdesk
//!
//! Search the web for articles, land them in a SQL warehouse, and ask the
//! warehouse LLM about them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐   ┌───────────┐
//! │  Intake  │──▶│ Search client│──▶│ Ingestion sink│──▶│  Display  │
//! │ CLI/HTTP │   │  (provider)  │   │ (1 tx/batch)  │   │ text/HTML │
//! └──────────┘   └──────────────┘   └───────────────┘   └───────────┘
//!                        │                                    ▲
//!                        └────────── results ─────────────────┘
//! ```
//!
//! Display never waits on persistence success: a failed batch is reported
//! next to the results, not instead of them.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and secrets |
//! | [`models`] | Query, document, and row types |
//! | [`search`] | Search provider trait and hosted client |
//! | [`ingest`] | Batch ingestion sink |
//! | [`store`] | Warehouse storage backends |
//! | [`controller`] | Per-session invocation state machine |
//! | [`completion`] | LLM completion and text functions |
//! | [`debate`] | Pro/con argument generator |
//! | [`display`] | Text and HTML rendering |
//! | [`server`] | HTTP page and JSON API |
//! | [`db`] | Warehouse connection pool |
//! | [`migrate`] | Table creation |

pub mod commands;
pub mod completion;
pub mod config;
pub mod controller;
pub mod db;
pub mod debate;
pub mod display;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod search;
pub mod server;
pub mod store;
