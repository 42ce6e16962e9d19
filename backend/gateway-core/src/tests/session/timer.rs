use crate::session::timer::millis;
use crate::session::{HANDSHAKE_FALLBACK_DELAY, REQUEST_TIMEOUT};

use std::time::Duration;

/// **VALUE**: Verifies durations convert to whole milliseconds and saturate instead of
/// wrapping.
///
/// **WHY THIS MATTERS**: The same conversion feeds config defaults and timeout error
/// messages. A wrapping cast would turn a huge timeout into a tiny one.
///
/// **BUG THIS CATCHES**: Would catch an `as u64` truncation coming back.
#[test]
fn given_durations_when_converted_to_millis_then_exact_or_saturated() {
    // GIVEN / WHEN / THEN: Protocol constants convert exactly
    assert_eq!(millis(HANDSHAKE_FALLBACK_DELAY), 3_000);
    assert_eq!(millis(REQUEST_TIMEOUT), 30_000);
    assert_eq!(millis(Duration::from_micros(1_999)), 1);

    // GIVEN / WHEN / THEN: Out-of-range durations saturate
    assert_eq!(millis(Duration::MAX), u64::MAX);
}
