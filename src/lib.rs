//! Markdown knowledge-base sync and hybrid retrieval for AI agents.
//!
//! mnema keeps a persisted chunk store convergent with a workspace of
//! markdown documents and answers retrieval queries for an autonomous agent:
//!
//! - **Sync**: documents are split at `##` headings into chunks keyed by
//!   `(source, heading)`; a content fingerprint decides insert / update /
//!   skip, and headings that vanish from a document are deleted from the
//!   store. Re-running sync on an unchanged corpus writes nothing.
//! - **Recall**: hybrid retrieval fusing vector similarity (remote
//!   embeddings + [sqlite-vec](https://github.com/asg017/sqlite-vec) KNN)
//!   with keyword substring search into one deterministically ranked list.
//! - **Boot context**: a bounded, deduplicated bundle of high-importance and
//!   recent chunks plus known entities, assembled at agent startup.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`embedding`] — Embedding client for OpenAI-compatible endpoints
//! - [`memory`] — Core engine: chunking, sync, recall, and boot context

pub mod config;
pub mod db;
pub mod embedding;
pub mod memory;
