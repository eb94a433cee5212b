//! Security checks applied to uploads and archive contents.

pub mod path;
pub mod quota;

pub use path::validate_all;
pub use path::validate_path;
pub use quota::QuotaLimit;
pub use quota::QuotaTracker;
