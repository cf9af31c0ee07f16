use prism_engine::render::Shape;

use crate::tunables::{FPS_RANGE, SPEED_RANGE, Tunables};

/// Read-only state shown by the panel.
pub struct PanelStatus<'a> {
    pub fps: f64,
    pub last_error: Option<&'a str>,
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct PanelActions {
    pub reload_shaders: bool,
}

/// Builds the FPS readout and the controls window for one frame.
pub fn show(ctx: &egui::Context, tunables: &mut Tunables, status: &PanelStatus<'_>) -> PanelActions {
    let mut actions = PanelActions::default();

    if ctx.input(|i| i.key_pressed(egui::Key::F1)) {
        tunables.show_controls = !tunables.show_controls;
    }

    egui::Area::new(egui::Id::new("prism fps"))
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("FPS: {:.1}", status.fps))
                    .monospace()
                    .color(egui::Color32::WHITE),
            );
        });

    let mut open = tunables.show_controls;
    egui::Window::new("Visualization Controls")
        .open(&mut open)
        .resizable(false)
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| {
            egui::ComboBox::from_label("Shape")
                .selected_text(tunables.current_shape.label())
                .show_ui(ui, |ui| {
                    for shape in Shape::ALL {
                        ui.selectable_value(&mut tunables.current_shape, shape, shape.label());
                    }
                });

            ui.checkbox(&mut tunables.rainbow_mode, "Rainbow Mode");
            if !tunables.rainbow_mode {
                ui.horizontal(|ui| {
                    ui.color_edit_button_rgb(&mut tunables.shape_color);
                    ui.label("Shape Color");
                });
            }

            ui.horizontal(|ui| {
                ui.color_edit_button_rgb(&mut tunables.background_color);
                ui.label("Background Color");
            });

            ui.add(egui::Slider::new(&mut tunables.animation_speed, SPEED_RANGE).text("Animation Speed"));
            ui.add(egui::Slider::new(&mut tunables.target_fps, FPS_RANGE).text("Target FPS"));
            if tunables.target_fps == 0 {
                ui.weak("uncapped");
            }

            ui.separator();
            if ui.button("Reload shaders").clicked() {
                actions.reload_shaders = true;
            }
            if let Some(err) = status.last_error {
                ui.colored_label(egui::Color32::from_rgb(255, 110, 110), err);
            }

            ui.separator();
            ui.weak("F1 toggles this window");
        });
    tunables.show_controls = open;

    actions
}
