//! ccscope-core: scope resolution and override engine for layered Claude Code
//! configuration, plus the pattern-based skill/command security scanner.
//!
//! Pipeline: [`discovery`] locates files per scope, [`fragment::load_fragments`]
//! reads them into [`ConfigFragment`]s, and each resolver turns that snapshot into
//! one immutable, source-attributed result.

pub mod discovery;
pub mod edit;
pub mod error;
pub mod fragment;
pub mod health;
pub mod hooks;
pub mod jsonc;
pub mod mcp;
pub mod memory;
pub mod permissions;
pub mod scope;
pub mod security;
pub mod settings;

pub use discovery::ConfigPaths;
pub use error::{InspectError, Result};
pub use fragment::{ConfigFragment, FileType, FragmentContent, FragmentIssue};
pub use scope::Scope;
