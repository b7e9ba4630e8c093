//! Inbound response handling

mod classifier;
mod normalizer;

pub use classifier::{business_status_for_code, ApiResponse, RawResponse, ResponseClassifier};
pub use normalizer::{normalize_list, NormalizedList, PageDefaults};
