use std::time::Duration;

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::egui::{self, Align2, Color32, FontId, RichText};
use bevy_egui::{EguiContexts, EguiPlugin};

use crate::config::{FlickerMode, Revision, RunOverrides, RunParameters};
use crate::effects::{StartScenario, TriggerLabel};
use crate::scenario::{ScenarioController, ScenarioPhase};

pub struct UiPlugin;
impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .init_resource::<HudToggles>()
            .add_systems(Update, (hud_system, settings_ui, help_ui))
            .add_systems(Update, debrief_ui.run_if(in_state(ScenarioPhase::Debrief)));
    }
}

#[derive(Resource)]
pub struct HudToggles {
    pub show_help: bool,
    pub show_settings: bool,
}

impl Default for HudToggles {
    fn default() -> Self {
        Self {
            show_help: true,
            show_settings: false,
        }
    }
}

fn label_color(label: &TriggerLabel) -> Color32 {
    if label.alert {
        Color32::RED
    } else {
        Color32::WHITE
    }
}

fn hud_system(
    mut contexts: EguiContexts,
    label: Res<TriggerLabel>,
    controller: Res<ScenarioController>,
    mut ev_start: EventWriter<StartScenario>,
) {
    egui::Area::new("trigger_banner".into())
        .anchor(Align2::CENTER_TOP, egui::vec2(0.0, 12.0))
        .show(contexts.ctx_mut(), |ui| {
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new("Earthquake Safety Zone")
                        .font(FontId::proportional(18.0))
                        .color(Color32::LIGHT_GRAY),
                );
                ui.label(
                    RichText::new(label.text)
                        .font(FontId::proportional(32.0))
                        .color(label_color(&label)),
                );
                if let Some(remaining) = controller.remaining() {
                    ui.label(format!("{:.1}s", remaining.as_secs_f32()));
                }
                let idle = controller.phase() != ScenarioPhase::Running;
                if ui
                    .add_enabled(idle, egui::Button::new("Start Simulation"))
                    .clicked()
                {
                    ev_start.send(StartScenario);
                }
            });
        });
}

fn debrief_ui(
    mut contexts: EguiContexts,
    controller: Res<ScenarioController>,
    mut ev_start: EventWriter<StartScenario>,
) {
    let Some(report) = controller.report() else {
        return;
    };
    let color = if report.survived {
        Color32::GREEN
    } else {
        Color32::RED
    };

    egui::Window::new("Debrief")
        .anchor(Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .collapsible(false)
        .resizable(false)
        .show(contexts.ctx_mut(), |ui| {
            ui.label(
                RichText::new(report.message)
                    .font(FontId::proportional(28.0))
                    .color(color),
            );
            ui.label(format!("Drills completed: {}", controller.runs_completed()));
            if ui.button("Try Again").clicked() {
                ev_start.send(StartScenario);
            }
        });
}

fn duration_slider(
    ui: &mut egui::Ui,
    value: &mut Duration,
    range: std::ops::RangeInclusive<f32>,
    text: &str,
) {
    let mut secs = value.as_secs_f32();
    if ui
        .add(egui::Slider::new(&mut secs, range).text(text))
        .changed()
    {
        *value = Duration::from_secs_f32(secs);
    }
}

fn settings_ui(
    mut contexts: EguiContexts,
    toggles: Res<HudToggles>,
    mut params: ResMut<RunParameters>,
    overrides: Res<RunOverrides>,
    controller: Res<ScenarioController>,
    diagnostics: Res<DiagnosticsStore>,
) {
    if !toggles.show_settings {
        return;
    }

    egui::Window::new("Settings").show(contexts.ctx_mut(), |ui| {
        ui.label(format!("Phase: {:?}", controller.phase()));
        ui.label(format!("Drills completed: {}", controller.runs_completed()));
        if let Some(baseline) = controller.baseline() {
            ui.label(format!("Light baseline: {:.0} lm", baseline));
        }
        if let Some(fps) = diagnostics.get(&FrameTimeDiagnosticsPlugin::FPS) {
            if let Some(value) = fps.smoothed() {
                ui.label(format!("FPS: {:.1}", value));
            }
        }
        ui.label("Changes apply to the next drill.");

        ui.separator();

        let mut revision = params.revision;
        egui::ComboBox::from_label("Revision")
            .selected_text(revision.label())
            .show_ui(ui, |ui| {
                for r in Revision::ALL {
                    ui.selectable_value(&mut revision, r, r.label());
                }
            });
        if revision != params.revision {
            *params = overrides.apply_to(revision).unwrap_or_else(|e| {
                warn!("config overrides do not fit {}: {e}", revision.label());
                RunParameters::from_revision(revision)
            });
        }

        ui.separator();

        duration_slider(ui, &mut params.shake_duration, 8.0..=10.0, "Duration (s)");
        ui.add(egui::Slider::new(&mut params.shake_magnitude.x, 0.0..=0.5).text("Shake X"));
        ui.add(egui::Slider::new(&mut params.shake_magnitude.y, 0.0..=0.5).text("Shake Y"));
        ui.add(egui::Slider::new(&mut params.shake_magnitude.z, 0.0..=0.5).text("Shake Z"));
        duration_slider(ui, &mut params.flicker_tick, 0.1..=0.5, "Flicker tick (s)");
        match &mut params.flicker_mode {
            FlickerMode::Scale { min, max } => {
                ui.add(egui::Slider::new(min, 0.0..=1.0).text("Flicker min"));
                ui.add(egui::Slider::new(max, 1.0..=2.0).text("Flicker max"));
            }
            FlickerMode::Alternate { dim } => {
                ui.add(egui::Slider::new(dim, 0.0..=1.0).text("Flicker dim"));
            }
        }

        ui.separator();

        ui.checkbox(&mut params.shake_props, "Shake props");
        ui.checkbox(&mut params.dust_enabled, "Falling dust");
    });
}

fn help_ui(mut contexts: EguiContexts, toggles: Res<HudToggles>) {
    if !toggles.show_help {
        return;
    }
    egui::Window::new("Help")
        .anchor(Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(contexts.ctx_mut(), |ui| {
            ui.label("WASD/Arrows: Walk");
            ui.label("Shift: Faster");
            ui.label("Q/E: Crouch / Stand");
            ui.label("Right Mouse: Look (drag)");
            ui.label("Left Mouse on green button: Start drill");
            ui.label("Enter: Start drill");
            ui.label("F1: Toggle Settings");
            ui.label("H: Toggle Help");
        });
}
