//! Injectable time source.
//!
//! Services stamp `created_at`/`updated_at` through a [`Clock`] instead of calling
//! `Utc::now()` directly, so tests can pin time.

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// A clock that always returns `at`.
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}
