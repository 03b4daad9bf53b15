//! Client-side guestbook view logic, independent of any I/O runtime.

pub mod guestbook_view;
