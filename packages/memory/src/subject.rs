//! Subject matching with single- and multi-token wildcards.

use keybus_substrate::SubstrateError;

/// Token separator in subjects and key patterns.
pub const SEPARATOR: char = '.';
/// Wildcard matching exactly one token.
pub const WILDCARD_TOKEN: &str = "*";
/// Wildcard matching one or more trailing tokens.
pub const WILDCARD_TAIL: &str = ">";

/// True when `subject` matches `pattern`.
///
/// Tokens are separated by `.`; `*` matches exactly one token and `>`
/// matches one or more trailing tokens. Matching is literal otherwise.
pub fn matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split(SEPARATOR);
    let mut subject_tokens = subject.split(SEPARATOR);

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (None, None) => return true,
            (Some(WILDCARD_TAIL), Some(_)) => return true,
            (Some(p), Some(s)) if p == WILDCARD_TOKEN || p == s => {}
            _ => return false,
        }
    }
}

/// Validate a subject for publishing: non-empty tokens, no wildcards.
pub fn validate_subject(subject: &str) -> Result<(), SubstrateError> {
    let invalid = subject.is_empty()
        || subject.split(SEPARATOR).any(|token| {
            token.is_empty() || token == WILDCARD_TOKEN || token == WILDCARD_TAIL
        });
    if invalid {
        return Err(SubstrateError::InvalidSubject {
            subject: subject.to_string(),
        });
    }
    Ok(())
}

/// Validate a subscription pattern: non-empty tokens, `>` only in the
/// final position.
pub fn validate_pattern(pattern: &str) -> Result<(), SubstrateError> {
    let tokens: Vec<&str> = pattern.split(SEPARATOR).collect();
    let invalid = pattern.is_empty()
        || tokens.iter().any(|token| token.is_empty())
        || tokens
            .iter()
            .enumerate()
            .any(|(idx, token)| *token == WILDCARD_TAIL && idx != tokens.len() - 1);
    if invalid {
        return Err(SubstrateError::InvalidSubject {
            subject: pattern.to_string(),
        });
    }
    Ok(())
}
