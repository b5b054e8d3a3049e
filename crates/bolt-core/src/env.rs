//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system resources (wall clock, randomness).
//! Production uses the system clock and OS entropy; simulation uses a manual
//! clock and a seeded RNG.

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `wall_clock_ms()` returns milliseconds since the Unix epoch
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Given the same seed, a simulated environment yields the same sequence
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    ///
    /// Used for message timestamps only. The session clamps timestamps to be
    /// non-decreasing, so a clock that steps backwards is tolerated.
    fn wall_clock_ms(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
