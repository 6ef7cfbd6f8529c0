//! Scope vocabulary shared by every resolver.
//!
//! Precedence is a static lookup table; resolvers never derive it from input.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration layer a fragment originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Organization-managed policy (`managed-settings.json`)
    Managed,
    /// User-global (`~/.claude/`)
    User,
    /// Project shared (`<project>/.claude/settings.json`, `.mcp.json`, `CLAUDE.md`)
    Project,
    /// Project local, not checked in (`settings.local.json`, `CLAUDE.local.md`)
    Local,
}

/// Scopes from highest to lowest precedence
const PRECEDENCE: [Scope; 4] = [Scope::Local, Scope::Project, Scope::User, Scope::Managed];

impl Scope {
    /// All scopes in declaration order (managed first)
    pub const ALL: [Scope; 4] = [Scope::Managed, Scope::User, Scope::Project, Scope::Local];

    /// Rank of this scope; lower rank wins
    pub fn precedence(self) -> usize {
        PRECEDENCE
            .iter()
            .position(|s| *s == self)
            .unwrap_or(PRECEDENCE.len())
    }

    /// Compare two scopes by precedence (higher priority sorts first)
    pub fn compare(a: Scope, b: Scope) -> Ordering {
        a.precedence().cmp(&b.precedence())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Managed => "managed",
            Scope::User => "user",
            Scope::Project => "project",
            Scope::Local => "local",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "managed" => Ok(Scope::Managed),
            "user" => Ok(Scope::User),
            "project" => Ok(Scope::Project),
            "local" => Ok(Scope::Local),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}
