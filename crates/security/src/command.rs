//! Command policy: substring denylist for `run_command`.
//!
//! Network downloaders are refused so that page content only ever enters
//! through the cached, blacklist-aware fetch path.

/// Result of checking a command against the denylist.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandCheck {
    Allowed,
    Denied { pattern: String },
}

#[derive(Debug, Clone, Default)]
pub struct CommandPolicy {
    denylist: Vec<String>,
}

impl CommandPolicy {
    pub fn new(denylist: Vec<String>) -> Self {
        Self {
            denylist: denylist
                .into_iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.trim().is_empty())
                .collect(),
        }
    }

    /// Case-insensitive substring match anywhere in the command line, so
    /// `echo x | CURL ...` and `/usr/bin/wget` are both caught.
    pub fn check(&self, command: &str) -> CommandCheck {
        let lower = command.to_lowercase();
        match self.denylist.iter().find(|p| lower.contains(p.as_str())) {
            Some(pattern) => CommandCheck::Denied {
                pattern: pattern.clone(),
            },
            None => CommandCheck::Allowed,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.denylist
    }
}
