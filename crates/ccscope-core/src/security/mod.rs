//! Security scanner for skill and command content.
//!
//! Evaluates free text against a fixed rule registry and rolls findings up to a
//! per-entry status and a batch summary.

pub mod collect;
pub mod rules;
pub mod scanner;
pub mod types;

pub use collect::collect_skill_inputs;
pub use scanner::SkillScanner;
pub use types::{
    ScanSummary, Severity, SkillFinding, SkillInput, SkillScanEntry, SkillScanResult, SkillStatus,
    SourceKind,
};
