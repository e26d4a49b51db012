//! Event crate error primitives.

use thiserror::Error;

/// Errors raised while parsing an info-hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InfoHashError {
    /// Input did not contain exactly 40 hex characters (or 20 raw bytes).
    #[error("info-hash has invalid length")]
    Length {
        /// Observed length of the input.
        length: usize,
    },
    /// Input contained characters outside the hex alphabet.
    #[error("info-hash is not hexadecimal")]
    NotHex,
}

/// Raised when a correlated subscription ends without a matching event.
///
/// This happens when the owning registry is dropped while the waiter is
/// still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("subscription closed before a matching event arrived")]
pub struct SubscriptionClosed;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_constant_messages() {
        assert_eq!(
            InfoHashError::Length { length: 3 }.to_string(),
            "info-hash has invalid length"
        );
        assert_eq!(
            InfoHashError::NotHex.to_string(),
            "info-hash is not hexadecimal"
        );
        assert_eq!(
            SubscriptionClosed.to_string(),
            "subscription closed before a matching event arrived"
        );
    }
}
