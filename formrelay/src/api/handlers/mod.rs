//! HTTP request handlers.
//!
//! - [`submissions`]: `/send-message` and `/send-file`

pub mod submissions;
