use subtle::ConstantTimeEq;

/// Compare a caller-supplied shared secret against the configured one using
/// constant-time comparison.
///
/// A missing or empty `provided` value never matches.
pub fn verify_shared_secret(expected: &str, provided: Option<&str>) -> bool {
    let provided = match provided {
        Some(value) if !value.is_empty() => value,
        _ => return false,
    };

    let expected_bytes = expected.as_bytes();
    let provided_bytes = provided.as_bytes();

    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(provided_bytes).into()
}
