// src/sweep/mod.rs
pub mod aggregate;
pub mod axis;
pub mod segmenter;
pub use aggregate::{aggregate, mean, median};
pub use axis::{interp, linear_residual, linspace, FrequencyAxis};
pub use segmenter::SweepSegmenter;
