//! Tool cache lookup, population, and materialisation operations.
//!
//! Entries follow the runner tool-cache layout: `{root}/{tool}/{version}/{platform}/`
//! holds the files and a sibling `{platform}.complete` marker records that the
//! entry was written in full.

mod copy;
mod lookup;
mod populate;

pub use copy::copy_from_cache;
pub use lookup::{CacheLookupResult, check_cache, entry_dir, marker_path};
pub use populate::populate_cache;
