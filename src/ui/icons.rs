//! Phosphor icon definitions for the overlay.
//!
//! Icons are initialized via `setup_fonts` when the app starts.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::safety::Severity;

/// Resource to track if fonts have been initialized.
#[derive(Resource, Default)]
pub struct FontsInitialized(pub bool);

/// System to initialize Phosphor icon fonts.
/// Runs in EguiPrimaryContextPass where the egui context is guaranteed to be ready.
pub fn setup_fonts(mut contexts: EguiContexts, mut initialized: ResMut<FontsInitialized>) {
    if initialized.0 {
        return;
    }

    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);

    ctx.set_fonts(fonts);
    initialized.0 = true;

    info!("Phosphor icon fonts initialized");
}

// Section headers
pub const SCALE: &str = egui_phosphor::regular::ARROWS_OUT;
pub const GRAVITY: &str = egui_phosphor::regular::MAGNET;
pub const REGISTRY: &str = egui_phosphor::regular::PLANET;
pub const ORIGIN: &str = egui_phosphor::regular::CROSSHAIR;
pub const SAFETY: &str = egui_phosphor::regular::SHIELD_CHECK;
pub const EVENTS: &str = egui_phosphor::regular::LIST_BULLETS;

// Severity markers
pub const INFO: &str = egui_phosphor::regular::INFO;
pub const WARNING: &str = egui_phosphor::regular::WARNING;
pub const ERROR: &str = egui_phosphor::regular::WARNING_CIRCLE;
pub const CRITICAL: &str = egui_phosphor::regular::WARNING_OCTAGON;
pub const FATAL: &str = egui_phosphor::regular::SKULL;

/// Icon for a safety event severity.
pub fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => INFO,
        Severity::Warning => WARNING,
        Severity::Error => ERROR,
        Severity::Critical => CRITICAL,
        Severity::Fatal => FATAL,
    }
}

pub fn severity_color(severity: Severity) -> egui::Color32 {
    match severity {
        Severity::Info => egui::Color32::from_rgb(150, 180, 220),
        Severity::Warning => egui::Color32::from_rgb(230, 190, 80),
        Severity::Error => egui::Color32::from_rgb(230, 120, 80),
        Severity::Critical | Severity::Fatal => egui::Color32::from_rgb(230, 70, 70),
    }
}
