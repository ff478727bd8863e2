// approval.rs — Content-bound approval credentials.
//
// An approval travels as a single string: "APPROVE:" followed by the exact
// command text it authorizes. It authorizes that one command and nothing
// else: not a category, not a prefix, not a later variant of the command.
// The only leniency is whitespace: both sides are normalized (runs collapsed
// to one space, ends trimmed) before comparison.

use serde::{Deserialize, Serialize};

/// Literal prefix every approval token must start with (case-sensitive).
pub const APPROVAL_PREFIX: &str = "APPROVE:";

/// A parsed approval token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalCredential {
    authorized: String,
}

impl ApprovalCredential {
    /// Parse a wire token. Returns `None` unless it starts with [`APPROVAL_PREFIX`].
    pub fn parse(token: &str) -> Option<Self> {
        token.strip_prefix(APPROVAL_PREFIX).map(|rest| Self {
            authorized: normalize_command(rest),
        })
    }

    /// Build a credential for `command` (what a human reviewer would issue).
    pub fn for_command(command: &str) -> Self {
        Self {
            authorized: normalize_command(command),
        }
    }

    /// The normalized command text this credential authorizes.
    pub fn authorized_command(&self) -> &str {
        &self.authorized
    }

    /// The wire form, `APPROVE:<command>`.
    pub fn to_token(&self) -> String {
        format!("{}{}", APPROVAL_PREFIX, self.authorized)
    }

    /// True only if `command` is the authorized command up to whitespace.
    pub fn authorizes(&self, command: &str) -> bool {
        self.authorized == normalize_command(command)
    }
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_command(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What the caller supplied as approval, relative to the command under evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// No token supplied.
    Absent,
    /// A token was supplied but lacks the `APPROVE:` prefix.
    Malformed,
    /// A well-formed token for a different command.
    Mismatched,
    /// A well-formed token for exactly this command.
    Matched,
}

impl ApprovalState {
    /// Evaluate an optional wire token against a command.
    pub fn evaluate(command: &str, token: Option<&str>) -> Self {
        match token {
            None => ApprovalState::Absent,
            Some(token) => match ApprovalCredential::parse(token) {
                None => ApprovalState::Malformed,
                Some(credential) if credential.authorizes(command) => ApprovalState::Matched,
                Some(_) => ApprovalState::Mismatched,
            },
        }
    }

    pub fn is_approved(self) -> bool {
        self == ApprovalState::Matched
    }

    /// Short phrase used in block messages.
    pub fn describe(self) -> &'static str {
        match self {
            ApprovalState::Absent => "without approval token",
            ApprovalState::Malformed => "with malformed approval token (missing 'APPROVE:' prefix)",
            ApprovalState::Mismatched => "with approval token for a different command",
            ApprovalState::Matched => "with matching approval token",
        }
    }
}
