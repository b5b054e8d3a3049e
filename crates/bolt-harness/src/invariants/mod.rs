//! Properties every rendered view must satisfy.
//!
//! Scenario tests pin down particular conversations; these checks run after
//! every render of every simulated session, whatever the event order.
//! [`SimDriver`](crate::SimDriver) and [`NetDriver`](crate::NetDriver)
//! capture an [`AppView`] per render and record each [`Violation`] instead
//! of aborting, so a test can report all of them at the end.
//!
//! ```ignore
//! let view = AppView::capture(&app);
//! if let Err(found) = InvariantRegistry::standard().check_all(&view) {
//!     eprintln!("{found:?}");
//! }
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    CountdownRequiresPresence, CursorInBounds, MonotonicTimestamps, PresenceWithinCapacity,
    ReconnectOnlyWhenIdle,
};
pub use snapshot::AppView;

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A broken property and what the view looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which check failed.
    pub invariant: &'static str,
    /// Offending values.
    pub message: String,
}

impl Violation {
    /// Report a failure of `invariant`.
    pub fn new(invariant: &'static str, message: impl Into<String>) -> Self {
        Self { invariant, message: message.into() }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of a single [`AppView`].
pub trait Invariant: Send + Sync {
    /// Short name used in violation reports.
    fn name(&self) -> &'static str;

    /// Inspect `view`.
    fn check(&self, view: &AppView) -> InvariantResult;
}

/// Ordered set of invariants run together.
#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every check defined in this module.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(MonotonicTimestamps);
        registry.add(PresenceWithinCapacity);
        registry.add(CountdownRequiresPresence);
        registry.add(CursorInBounds);
        registry.add(ReconnectOnlyWhenIdle);
        registry
    }

    /// Register another check.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Run every check, collecting all failures rather than stopping at the
    /// first.
    pub fn check_all(&self, view: &AppView) -> Result<(), Vec<Violation>> {
        let found: Vec<Violation> =
            self.invariants.iter().filter_map(|invariant| invariant.check(view).err()).collect();
        if found.is_empty() { Ok(()) } else { Err(found) }
    }

    /// Names of the registered checks, in run order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.invariants.iter().map(|invariant| invariant.name())
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Whether no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
