//! Event source backends.

mod manual_backend;
mod notify_backend;

pub use manual_backend::{ManualSource, ManualSourceHandle};
pub use notify_backend::NotifySource;
