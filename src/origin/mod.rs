//! Floating origin: sector coordinates and universe recentering.

mod sector;
mod tracker;

#[cfg(test)]
mod proptest_origin;

pub use sector::VirtualPosition;
pub use tracker::{OriginStats, OriginTracker};
