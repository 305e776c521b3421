//! TMDB movie/TV pipeline: fetch raw records, convert them into normalized
//! tables with embeddings, and render a bounded PostgreSQL seed script.

pub mod cli;
pub mod database_ops;
pub mod embedding;
pub mod error;
pub mod normalization;
pub mod tracing;

pub mod util {
    pub mod env;
    pub mod jsonl;
    #[cfg(test)]
    pub(crate) mod stub_http;
}
