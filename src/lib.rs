//! Cross-project export index and subclass matcher for TypeScript/JavaScript packages.
//!
//! Reference projects are indexed into globally unique export ids
//! (`name::./file.js::project`); target projects are scanned for classes that extend
//! those exports, directly, through renamed re-exports, or wrapped in mixin calls.
//! [`query::QueryOrchestrator`] drives the whole pipeline.

pub mod analyzers;
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod parser;
pub mod project;
pub mod query;
pub mod resolver;
pub mod walker;
pub mod warning;

pub use analyzers::{AnalyzerName, AnalyzerQueryResult, MatchEntry, ProjectMatches, QueryResultItem};
pub use error::{Error, Result};
pub use index::ExportSpecifier;
pub use query::{QueryConfig, QueryOrchestrator, RunConfig};
pub use warning::{Warning, WarningKind};
