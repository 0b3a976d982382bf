//! Deferred unit actions
//!
//! An `Action` pairs a unit with a closure and runs it on demand. It never
//! inspects the result: whatever the closure returns (usually an `Outcome`,
//! or a `Result` wrapping one) comes back from `run` untouched.

use crate::unit::{SharedUnit, Unit};
use std::fmt;
use std::rc::Rc;

/// A bound, deferred computation issued by a unit
///
/// Nothing stops `run` from being called twice; doing so runs the closure
/// again with all its side effects. Callers that need at-most-once must
/// track that themselves.
pub struct Action<R> {
    unit: SharedUnit,
    task: Box<dyn FnMut() -> R>,
}

impl<R> Action<R> {
    /// Store the unit and the closure; nothing runs yet
    pub fn new(unit: SharedUnit, task: impl FnMut() -> R + 'static) -> Self {
        Self {
            unit,
            task: Box::new(task),
        }
    }

    /// Action whose closure gets the unit itself
    ///
    /// The unit is borrowed mutably only while the closure runs, so it must
    /// not be borrowed elsewhere at that moment.
    pub fn bound(unit: SharedUnit, mut task: impl FnMut(&mut Unit) -> R + 'static) -> Self {
        let handle = Rc::clone(&unit);
        Self::new(unit, move || task(&mut handle.borrow_mut()))
    }

    /// The unit that issued this action
    pub fn unit(&self) -> &SharedUnit {
        &self.unit
    }

    /// Run the closure and return its result as-is
    pub fn run(&mut self) -> R {
        (self.task)()
    }
}

impl<R> fmt::Debug for Action<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.unit.try_borrow();
        f.debug_struct("Action")
            .field("unit", &unit.as_ref().map(|u| u.unit_ref()).ok())
            .finish_non_exhaustive()
    }
}
