//! Club knowledge-base retrieval service.
//!
//! A local-first RAG backend for a video-creation club: markdown knowledge
//! files are scanned, chunked along their headings, embedded, and stored in
//! SQLite; queries are answered by cosine-similarity retrieval with a
//! curated FAQ short-circuit, and can be forwarded to a downstream
//! workflow webhook.
//!
//! # Modules
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`config`] | TOML configuration loading and validation |
//! | [`models`] | Shared data types |
//! | [`extract`] | Front matter, title, category, fingerprint |
//! | [`chunk`] | Header-aware, length-bounded chunking |
//! | [`embedding`] | Remote embeddings with deterministic local fallback |
//! | [`store`] | Storage trait with SQLite and in-memory backends |
//! | [`ingest`] | Scan, chunk, embed, store pipeline |
//! | [`search`] | Cosine-similarity retrieval |
//! | [`faq`] | Curated FAQ table with exact matching |
//! | [`compose`] | Prompt composition and text compression |
//! | [`answer`] | Query answering over FAQ and retrieval |
//! | [`webhook`] | Downstream workflow forwarding |
//! | [`members`] | Member roster rendering |
//! | [`server`] | HTTP API |

pub mod answer;
pub mod chunk;
pub mod compose;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod faq;
pub mod ingest;
pub mod members;
pub mod migrate;
pub mod models;
pub mod search;
pub mod server;
pub mod store;
pub mod webhook;
