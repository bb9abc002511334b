//! # repo-ask
//!
//! Ask natural-language questions about a GitHub repository, addressed as
//! `@RepoName` inside the question, and get answers grounded in its code and
//! commit history.
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────┐
//!                     │ "@repo how does X?"  │
//!                     └──────────┬───────────┘
//!                                ▼
//!                     ┌──────────────────────┐
//!                     │ @Repo lookup         │──► unknown: list known repos
//!                     └──────────┬───────────┘
//!                                ▼
//!                     ┌──────────────────────┐
//!                     │ Intent classifier    │
//!                     └──────────┬───────────┘
//!        ┌──────────┬────────────┼─────────────┬──────────────┐
//!        ▼          ▼            ▼             ▼              ▼
//!   ┌─────────┐ ┌────────┐ ┌───────────┐ ┌────────────┐ ┌──────────┐
//!   │ command │ │timeline│ │   flow    │ │test/sec/   │ │  debug   │
//!   │ listing │ │commits │ │vector +   │ │health      │ │vector +  │
//!   │         │ │ API    │ │flow facts │ │cached rpt  │ │history   │
//!   └────┬────┘ └───┬────┘ └─────┬─────┘ └─────┬──────┘ └────┬─────┘
//!        │          │            └──────┬──────┴─────────────┘
//!        │          │                   ▼
//!        │          │        ┌──────────────────────┐
//!        │          │        │ Resilient completion │
//!        │          │        │ retry + model chain  │
//!        │          │        └──────────┬───────────┘
//!        │          │                   ▼
//!        │          │        ┌──────────────────────┐
//!        │          │        │ Sanitize + mermaid   │
//!        │          │        └──────────┬───────────┘
//!        └──────────┴───────────────────┴──► AskResponse
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, data dir, LLM and GitHub
//! - [`models`] - Shared data types: `RepoRef`, `CodeChunk`, commits, request/response types
//! - [`store`] - Key-value persistence with optional TTL (in-memory or JSON file)
//! - [`registry`] - Registered repositories and their vector collection names
//! - [`cache`] - Generated reports cached per repo and report type
//! - [`git`] - Source-control capability and its GitHub REST implementation
//! - [`chunking`] - Fixed-size text windows for indexing
//! - [`ingest`] - List, read, chunk, embed and index a repository
//! - [`search`] - Vector index capability and the cosine-similarity store
//! - [`llm`] - Embedding/completion providers, retrying caller, keyword expansion, sanitizing
//! - [`query`] - Intent routing and the per-mode answer pipelines
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state wiring the capabilities together

pub mod api;
pub mod cache;
pub mod chunking;
pub mod config;
pub mod git;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod query;
pub mod registry;
pub mod search;
pub mod state;
pub mod store;
