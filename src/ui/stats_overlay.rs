//! Debug window with live statistics from every celestial subsystem.

use std::time::Duration;

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::plugin::CelestialCore;
use crate::safety::Severity;
use crate::types::units_to_km;

use super::icons;

/// Overlay visibility and layout.
#[derive(Resource)]
pub struct StatsOverlayState {
    pub visible: bool,
    /// Number of recent safety events listed.
    pub event_rows: usize,
}

impl Default for StatsOverlayState {
    fn default() -> Self {
        Self {
            visible: true,
            event_rows: 8,
        }
    }
}

/// Toggle the overlay with F3.
pub fn toggle_overlay(keys: Res<ButtonInput<KeyCode>>, mut state: ResMut<StatsOverlayState>) {
    if keys.just_pressed(KeyCode::F3) {
        state.visible = !state.visible;
    }
}

/// Human-readable distance for world units.
pub fn format_distance(units: f64) -> String {
    let km = units_to_km(units);
    if km.abs() >= 1.0e6 {
        format!("{:.2} M km", km / 1.0e6)
    } else if km.abs() >= 1.0 {
        format!("{:.1} km", km)
    } else {
        format!("{:.1} m", km * 1000.0)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_secs_f64() * 1.0e6;
    if micros >= 1000.0 {
        format!("{:.2} ms", micros / 1000.0)
    } else {
        format!("{:.1} µs", micros)
    }
}

fn section_header(ui: &mut egui::Ui, icon: &str, title: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(icon).size(16.0));
        ui.label(egui::RichText::new(title).strong().size(15.0));
    });
}

fn stat_row(ui: &mut egui::Ui, label: &str, value: impl Into<String>) {
    ui.label(egui::RichText::new(label).weak());
    ui.label(egui::RichText::new(value.into()).monospace());
    ui.end_row();
}

pub fn stats_overlay_system(
    mut contexts: EguiContexts,
    state: Res<StatsOverlayState>,
    core: Option<Res<CelestialCore>>,
) {
    if !state.visible {
        return;
    }
    let Some(core) = core else {
        return;
    };
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let scale = core.scale.stats();
    let gravity = core.gravity.stats();
    let registry = core.registry.stats();
    let origin = core.origin.stats();
    let safety = core.safety.stats();
    let events = core.safety.recent_events(state.event_rows);

    egui::Window::new("Celestial Core")
        .resizable(false)
        .default_width(280.0)
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(12.0, 12.0))
        .show(ctx, |ui| {
            section_header(ui, icons::ORIGIN, "Origin");
            egui::Grid::new("origin_stats").num_columns(2).show(ui, |ui| {
                stat_row(ui, "Recenters", origin.recenter_count.to_string());
                stat_row(ui, "From origin", format_distance(origin.distance_from_origin));
                stat_row(ui, "Precision", format!("{:.1}%", origin.precision_error * 100.0));
                stat_row(
                    ui,
                    "Sector",
                    format!("{} {} {}", origin.sector.x, origin.sector.y, origin.sector.z),
                );
                stat_row(ui, "Travelled", format_distance(origin.world_position.length()));
            });

            ui.separator();
            section_header(ui, icons::REGISTRY, "Bodies");
            egui::Grid::new("registry_stats").num_columns(2).show(ui, |ui| {
                stat_row(ui, "Live / registered", format!("{} / {}", registry.live, registry.registered));
                stat_row(ui, "Translations", registry.translations.to_string());
            });

            ui.separator();
            section_header(ui, icons::SCALE, "Scale");
            egui::Grid::new("scale_stats").num_columns(2).show(ui, |ui| {
                stat_row(ui, "Method", scale.method.to_string());
                stat_row(ui, "Cache", scale.cache_size.to_string());
                stat_row(ui, "Hit rate", format!("{:.1}%", scale.hit_rate() * 100.0));
            });

            ui.separator();
            section_header(ui, icons::GRAVITY, "Gravity");
            egui::Grid::new("gravity_stats").num_columns(2).show(ui, |ui| {
                stat_row(ui, "Mode", gravity.mode.to_string());
                stat_row(ui, "This frame", gravity.calculations_this_frame.to_string());
                stat_row(ui, "Avg query", format_duration(gravity.average_time()));
            });

            ui.separator();
            section_header(ui, icons::SAFETY, "Safety");
            ui.horizontal(|ui| {
                for severity in Severity::ALL {
                    let count = safety.counts.get(severity);
                    ui.label(
                        egui::RichText::new(format!("{} {}", icons::severity_icon(severity), count))
                            .color(icons::severity_color(severity)),
                    )
                    .on_hover_text(severity.label());
                }
            });

            if !events.is_empty() {
                ui.separator();
                section_header(ui, icons::EVENTS, "Recent events");
                for event in events.iter().rev() {
                    ui.label(
                        egui::RichText::new(format!(
                            "{} {} {}",
                            icons::severity_icon(event.severity),
                            event.timestamp.format("%H:%M:%S"),
                            event.message
                        ))
                        .color(icons::severity_color(event.severity))
                        .size(12.0),
                    );
                }
            }
        });
}
