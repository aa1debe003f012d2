//! Re-exports for consumers who prefer a single import.
//!
//! ```
//! use http_cache_policy::prelude::*;
//! let options = PolicyOptions::default().with_shared(false);
//! # let _ = options;
//! ```

pub use crate::codec::{BincodeCodec, JsonCodec, PolicyCodec, PolicyRecord};
pub use crate::directives::{Directives, MaxStale};
pub use crate::error::{PolicyError, PolicyMisuseError};
pub use crate::headers::Vary;
pub use crate::policy::{CachePolicy, PolicyOptions};
pub use crate::record::{RequestRecord, ResponseRecord};
pub use crate::revalidation::Revalidated;
pub use crate::storability::NotStorable;
