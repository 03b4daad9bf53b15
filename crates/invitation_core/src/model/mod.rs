//! Domain model for the guestbook and the guest list.
//!
//! # Responsibility
//! - Define the records persisted by the store and the derived read views.
//! - Own timestamp parsing and day-label formatting shared by all layers.
//!
//! # Invariants
//! - `id` and `created_at` are assigned by the store, never by callers.
//! - Derived views (`Guestbook`) are recomputed on every read, never stored.

pub mod greeting;
pub mod guest;
