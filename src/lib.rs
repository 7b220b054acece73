//! Celestial Precision - floating origin, visual scaling and gravity for
//! large-scale space simulations.
//!
//! The core is four cooperating subsystems sharing one [`registry::BodyRegistry`]:
//! [`scale::ScaleEngine`], [`gravity::GravityEngine`], [`origin::OriginTracker`]
//! and [`safety::SafetyGuard`]. [`plugin::CelestialPlugin`] wires them into a
//! Bevy app.

pub mod body;
pub mod config;
pub mod gravity;
pub mod origin;
pub mod plugin;
pub mod registry;
pub mod safety;
pub mod scale;
pub mod types;
pub mod ui;

#[cfg(test)]
mod proptest_registry;
#[cfg(test)]
pub mod test_utils;
