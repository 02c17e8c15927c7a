//! Prefixed random identifiers.
//!
//! Suffixes are registered in the `issued_ids` table; the primary key on the
//! suffix makes issuing race-free across requests.

use anyhow::{Result, bail};
use rand::Rng;
use tracing::warn;

use crate::constants::ids::{ALPHABET, MAX_ISSUE_ATTEMPTS, SUFFIX_LEN};
use crate::db::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    User,
    Project,
    Channel,
    Misconduct,
    Like,
    Application,
    Location,
    Message,
}

impl IdKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::User => "UID_",
            Self::Project => "PID_",
            Self::Channel => "CID_",
            Self::Misconduct => "MID_",
            Self::Like => "LID_",
            Self::Application => "AID_",
            Self::Location => "GID_",
            Self::Message => "MSG_",
        }
    }

    /// Parses `user`, `project`, ... or a bare prefix such as `UID_`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let all = [
            Self::User,
            Self::Project,
            Self::Channel,
            Self::Misconduct,
            Self::Like,
            Self::Application,
            Self::Location,
            Self::Message,
        ];

        all.into_iter().find(|kind| {
            kind.prefix().eq_ignore_ascii_case(value)
                || kind.prefix().trim_end_matches('_').eq_ignore_ascii_case(value)
                || kind.name().eq_ignore_ascii_case(value)
        })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Channel => "channel",
            Self::Misconduct => "misconduct",
            Self::Like => "like",
            Self::Application => "application",
            Self::Location => "location",
            Self::Message => "message",
        }
    }
}

/// Random suffix of `SUFFIX_LEN` characters from `[A-Za-z0-9]`.
#[must_use]
pub fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// `prefix` followed by a fresh random suffix. Nothing is recorded.
#[must_use]
pub fn generate(prefix: &str) -> String {
    format!("{prefix}{}", random_suffix())
}

/// Splits a token into its prefix and suffix when it is well formed.
#[must_use]
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let (prefix, suffix) = token.split_at_checked(token.len().checked_sub(SUFFIX_LEN)?)?;
    let valid = !prefix.is_empty()
        && prefix.ends_with('_')
        && suffix.bytes().all(|b| b.is_ascii_alphanumeric());
    valid.then_some((prefix, suffix))
}

#[derive(Clone)]
pub struct IdRegistry {
    store: Store,
}

impl IdRegistry {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Draws a token of `kind` and records its suffix as used.
    pub async fn issue(&self, kind: IdKind) -> Result<String> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let suffix = random_suffix();
            if self.store.record_issued_id(kind.prefix(), &suffix).await? {
                return Ok(format!("{}{suffix}", kind.prefix()));
            }
            warn!(attempt, "Identifier suffix collision, drawing again");
        }

        bail!(
            "Could not issue a unique {} identifier after {MAX_ISSUE_ATTEMPTS} attempts",
            kind.prefix()
        )
    }

    /// Records the suffix of an externally supplied token, such as a channel
    /// chosen in a form. Returns false when the suffix was already issued.
    pub async fn record(&self, token: &str) -> Result<bool> {
        let Some((prefix, suffix)) = split_token(token) else {
            bail!("Malformed identifier: {token}");
        };
        self.store.record_issued_id(prefix, suffix).await
    }

    /// A token of `kind` whose suffix is not registered yet. It is not
    /// recorded, so it is only a suggestion (form defaults).
    pub async fn sample(&self, kind: IdKind) -> Result<String> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let suffix = random_suffix();
            if !self.store.is_id_issued(&suffix).await? {
                return Ok(format!("{}{suffix}", kind.prefix()));
            }
        }

        bail!("Could not sample an unused {} identifier", kind.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let token = generate(IdKind::Project.prefix());
        assert!(token.starts_with("PID_"));
        assert_eq!(token.len(), 4 + SUFFIX_LEN);
        assert!(token[4..].bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_suffixes_differ() {
        assert_ne!(random_suffix(), random_suffix());
    }

    #[test]
    fn test_split_token() {
        let token = generate("CID_");
        let (prefix, suffix) = split_token(&token).unwrap();
        assert_eq!(prefix, "CID_");
        assert_eq!(suffix.len(), SUFFIX_LEN);

        assert!(split_token("CID_short").is_none());
        assert!(split_token(&random_suffix()).is_none());
        assert!(split_token(&format!("CID_{}!", &random_suffix()[1..])).is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(IdKind::parse("user"), Some(IdKind::User));
        assert_eq!(IdKind::parse("PID_"), Some(IdKind::Project));
        assert_eq!(IdKind::parse("gid"), Some(IdKind::Location));
        assert_eq!(IdKind::parse("nope"), None);
    }
}
