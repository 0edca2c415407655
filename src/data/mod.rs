pub mod bucket;
pub mod spectrum;

pub use bucket::{validate_buckets, BucketDef, BucketTable, RowStatus};
pub use spectrum::{PpmAxis, Segment, Spectrum, SpectrumMatrix};
