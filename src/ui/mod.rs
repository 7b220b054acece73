//! egui debug overlay for the celestial core.

pub mod icons;
mod stats_overlay;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub use stats_overlay::{format_distance, format_duration, StatsOverlayState};

/// Plugin that draws the statistics window. Requires `EguiPlugin` and
/// `CelestialPlugin`; without a `CelestialCore` the window is not shown.
pub struct StatsOverlayPlugin;

impl Plugin for StatsOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StatsOverlayState>()
            .init_resource::<icons::FontsInitialized>()
            .add_systems(Update, stats_overlay::toggle_overlay)
            // Font initialization MUST run before any UI systems that use icons
            .add_systems(EguiPrimaryContextPass, icons::setup_fonts)
            .add_systems(
                EguiPrimaryContextPass,
                stats_overlay::stats_overlay_system
                    .after(icons::setup_fonts)
                    .run_if(|init: Res<icons::FontsInitialized>| init.0),
            );
    }
}
