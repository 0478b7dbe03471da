mod format;

pub use format::{format_bytes, truncate_string};
