//! Logging utilities with automatic sensitive data redaction.
//!
//! Secret seeds, proofs and nullifiers must never reach log output in the
//! clear. These wrappers make the safe form the convenient form at call
//! sites using `tracing`.

use std::fmt;

/// A wrapper that redacts sensitive data when displayed.
pub struct Redacted<T>(pub T);

impl<T: fmt::Display> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: fmt::Debug> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Redact a byte slice, showing only length.
pub struct RedactedBytes<'a>(pub &'a [u8]);

impl<'a> fmt::Display for RedactedBytes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} bytes]", self.0.len())
    }
}

impl<'a> fmt::Debug for RedactedBytes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Redact a hex string, showing only first and last 4 characters.
///
/// Commitments and nullifiers are pseudonymous rather than secret, but
/// full values in logs would still let log readers correlate activity.
pub struct RedactedHex<'a>(pub &'a str);

impl<'a> fmt::Display for RedactedHex<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        if s.len() > 12 {
            write!(f, "{}...{}", &s[..4], &s[s.len() - 4..])
        } else {
            write!(f, "[REDACTED HEX]")
        }
    }
}

impl<'a> fmt::Debug for RedactedHex<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_display() {
        let secret = "super-secret-seed";
        assert_eq!(format!("{}", Redacted(secret)), "[REDACTED]");
        assert_eq!(format!("{:?}", Redacted(secret)), "[REDACTED]");
    }

    #[test]
    fn test_redacted_bytes() {
        let bytes = [0u8; 32];
        assert_eq!(format!("{}", RedactedBytes(&bytes)), "[32 bytes]");
    }

    #[test]
    fn test_redacted_hex() {
        let hex = "a1b2c3d4e5f6a7b8c9d0";
        assert_eq!(format!("{}", RedactedHex(hex)), "a1b2...c9d0");
        assert_eq!(format!("{}", RedactedHex("short")), "[REDACTED HEX]");
    }
}
