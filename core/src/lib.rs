pub mod digest;
pub mod filter;
pub mod model;
pub mod truncate;

pub use digest::{
    render_digest, render_digest_with, Branding, Digest, DigestError, EmailRow, MAX_DIGEST_BYTES,
};
pub use filter::{apply_filters, apply_filters_at, FilterCriteria, SortKey, TimeWindow};
pub use model::{ResultItem, ResultSet, Source, Timestamp};
pub use truncate::truncate;
