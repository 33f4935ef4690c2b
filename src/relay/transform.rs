//! Response transforms applied before a backend answer reaches the client.

use std::fmt;

/// Rewrites a backend response in place before delivery.
///
/// Runs inside the critical section, so implementations must not block.
pub trait ResponseTransform: Send + Sync + fmt::Debug {
    fn apply(&self, response: &mut Vec<u8>);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Exchanges the final two bytes of every response of length two or more.
///
/// `AA BB CC DD` becomes `AA BB DD CC`; shorter responses pass through.
/// This is the relay's default transform and runs on every response.
#[derive(Debug, Default, Clone, Copy)]
pub struct SwapTrailingBytes;

impl ResponseTransform for SwapTrailingBytes {
    fn apply(&self, response: &mut Vec<u8>) {
        let len = response.len();
        if len >= 2 {
            response.swap(len - 2, len - 1);
        }
    }

    fn name(&self) -> &'static str {
        "swap-trailing-bytes"
    }
}

/// Delivers responses untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl ResponseTransform for Passthrough {
    fn apply(&self, _response: &mut Vec<u8>) {}

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swapped(bytes: &[u8]) -> Vec<u8> {
        let mut response = bytes.to_vec();
        SwapTrailingBytes.apply(&mut response);
        response
    }

    #[test]
    fn swaps_last_two_bytes() {
        assert_eq!(swapped(&[0xAA, 0xBB, 0xCC, 0xDD]), vec![0xAA, 0xBB, 0xDD, 0xCC]);
        assert_eq!(swapped(&[0x01, 0x02]), vec![0x02, 0x01]);
    }

    #[test]
    fn short_responses_unchanged() {
        assert_eq!(swapped(&[]), Vec::<u8>::new());
        assert_eq!(swapped(&[0x7F]), vec![0x7F]);
    }

    #[test]
    fn applying_twice_restores_the_response() {
        let original = b"hello relay".to_vec();
        let mut response = original.clone();
        SwapTrailingBytes.apply(&mut response);
        assert_ne!(response, original);
        SwapTrailingBytes.apply(&mut response);
        assert_eq!(response, original);
    }

    #[test]
    fn passthrough_is_identity() {
        let mut response = vec![1, 2, 3];
        Passthrough.apply(&mut response);
        assert_eq!(response, vec![1, 2, 3]);
    }
}
