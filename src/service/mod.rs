mod lifecycle;
mod report;
mod user;

pub use lifecycle::NewRequestInput;

use chrono::{Datelike, Utc};

use crate::store::LeaveStore;

/// Current calendar year: the default scope for balance lookups and the year
/// a freshly approved request debits against.
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// The lifecycle engine and its read surface, constructed with an injected
/// store so tests can run against [`crate::store::memory::InMemoryLeaveStore`].
pub struct LeaveService<S> {
    store: S,
}

impl<S: LeaveStore> LeaveService<S> {
    pub fn new(store: S) -> Self {
        LeaveService { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
