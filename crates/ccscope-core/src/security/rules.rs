//! Skill/command rule registry.
//!
//! Rules are data: adding detection capability means adding an entry here,
//! never touching the evaluation loop in [`super::scanner`].

use std::sync::LazyLock;

use regex::Regex;

use super::types::Severity;

/// Unit of text a rule pattern is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    /// Each line separately; findings carry a line number
    Line,
    /// The whole content at once; patterns may span lines
    Content,
}

/// One detection rule
#[derive(Debug)]
pub struct SkillRule {
    pub id: &'static str,
    pub severity: Severity,
    pub message: &'static str,
    pub mode: RuleMode,
    pub pattern: Regex,
}

/// Version of the rule set; bump when entries change
pub const RULESET_VERSION: u32 = 1;

fn rule(
    id: &'static str,
    severity: Severity,
    mode: RuleMode,
    pattern: &str,
    message: &'static str,
) -> SkillRule {
    SkillRule {
        id,
        severity,
        message,
        mode,
        pattern: Regex::new(pattern).expect("valid rule regex"),
    }
}

/// The ordered rule set
pub static RULES: LazyLock<Vec<SkillRule>> = LazyLock::new(|| {
    use RuleMode::{Content, Line};
    use Severity::{Critical, High, Low, Medium};

    vec![
        rule(
            "SKILL-001",
            Critical,
            Line,
            r"(?i)\b(curl|wget)\b[^|\n]*\|\s*(sudo\s+)?(ba|z|da)?sh\b",
            "Downloads a remote script and pipes it into a shell",
        ),
        rule(
            "SKILL-002",
            Critical,
            Line,
            r#"(?i)\brm\s+-[a-z]*(rf|fr)[a-z]*\s+["']?(/|~/?|\$HOME/?|\*)(["'\s]|$)"#,
            "Recursive forced delete of root, home, or wildcard",
        ),
        rule(
            "SKILL-003",
            Critical,
            Content,
            r"-----BEGIN\s+(RSA\s+|EC\s+|OPENSSH\s+)?PRIVATE\s+KEY-----",
            "Embedded private key",
        ),
        rule(
            "SKILL-004",
            High,
            Line,
            r"(sk-ant-[a-zA-Z0-9_-]{20,}|sk-[a-zA-Z0-9]{20,}|gh[pousr]_[a-zA-Z0-9]{36,}|AKIA[0-9A-Z]{16}|xox[baprs]-[0-9a-zA-Z-]{10,})",
            "Hardcoded API key or token",
        ),
        rule(
            "SKILL-005",
            High,
            Line,
            r"(?i)(~/\.ssh/|\bid_(rsa|ed25519)\b|\.aws/credentials|\.credentials\.json|\.netrc\b|\.git-credentials)",
            "References credential files",
        ),
        rule(
            "SKILL-006",
            High,
            Line,
            r"(?i)\b(ignore|disregard|forget)\s+(all\s+)?(the\s+)?(previous|prior|above)\s+(instructions|rules|prompts)",
            "Prompt-injection phrasing that overrides prior instructions",
        ),
        rule(
            "SKILL-007",
            High,
            Content,
            r"(?is)<!--.{0,400}?\b(ignore|instruction|system prompt|do not tell|secretly)\b.{0,400}?-->",
            "Hidden instructions inside an HTML comment",
        ),
        rule(
            "SKILL-008",
            Medium,
            Line,
            r"(?i)(--dangerously-skip-permissions|bypassPermissions)",
            "Disables permission prompts",
        ),
        rule(
            "SKILL-009",
            Medium,
            Line,
            r"(?i)base64\s+(-d|--decode)\b|\bfrom_?base64\b|\batob\(",
            "Decodes base64 payloads",
        ),
        rule(
            "SKILL-010",
            Medium,
            Line,
            r#"(?i)\beval\s*[("$`]"#,
            "Evaluates dynamically constructed code",
        ),
        rule(
            "SKILL-011",
            Medium,
            Line,
            r"(?i)\b(nc|ncat|netcat|socat)\b.*\s-(e|c)\s",
            "Network tool spawning a shell (possible reverse shell)",
        ),
        rule(
            "SKILL-012",
            Medium,
            Line,
            "[\u{200B}-\u{200F}\u{202A}-\u{202E}\u{2060}-\u{2064}\u{FEFF}]",
            "Invisible or bidirectional control characters",
        ),
        rule(
            "SKILL-013",
            Low,
            Line,
            r"(?i)\bsudo\s+\S",
            "Runs commands with sudo",
        ),
        rule(
            "SKILL-014",
            Low,
            Line,
            r"(?i)\b(curl|wget)\b[^\n]*\bhttps?://",
            "Fetches remote content",
        ),
        rule(
            "SKILL-015",
            Low,
            Line,
            r"(?i)\bchmod\s+(-R\s+)?(777|a\+w|o\+w)\b",
            "Makes files world-writable",
        ),
    ]
});
