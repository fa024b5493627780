//! Method extraction from subjects.

/// Extract the trailing method token from a subject.
///
/// The method is the token after the final `.` separator and must consist
/// of word characters only: `svc.v1.get_balance` yields `get_balance`. A
/// subject with no separator, or with an empty or non-word trailing token,
/// yields `None`.
pub fn method_token(subject: &str) -> Option<&str> {
    let (_, token) = subject.rsplit_once('.')?;
    let is_word = !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    is_word.then_some(token)
}
