mod size_matcher;

pub use size_matcher::{DecodePlan, SizeMatcher};
