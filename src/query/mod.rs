pub mod executor;
pub mod framer;

pub use executor::{QueryExecutor, QueryParams, ROOT_COMPARTMENT};
pub use framer::{bucket_count, frame, Buckets};
