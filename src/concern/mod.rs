pub mod catalog;
pub mod normalizer;
pub mod types;

pub use catalog::{
    BestPracticeCatalog, DEFAULT_STANDARD_IDS, filter_by_best_practices, filter_by_standards,
};
pub use normalizer::{Normalizer, NormalizerOptions};
pub use types::{AccessibilityConcern, BestPracticeEnrichment, FixType, RawFinding, Standard};
