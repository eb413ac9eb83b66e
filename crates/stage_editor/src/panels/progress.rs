//! Modal progress dialog for assembly operations.
//!
//! The dialog is a [`ProgressSink`], so it can be handed straight to the
//! assembly commands on `EditorState`: the pipeline writes fractions and
//! stage messages into it, and the Cancel button feeds back through
//! `is_cancelled` between batch items.

use stage_core::ProgressSink;

/// Progress window state. `begin` opens it, `finish` closes it, and the
/// host draws it each frame with [`ProgressDialog::ui`].
#[derive(Debug, Default)]
pub struct ProgressDialog {
    title: String,
    fraction: f32,
    message: String,
    open: bool,
    cancel_requested: bool,
}

impl ProgressDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog for a fresh operation.
    pub fn begin(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.fraction = 0.0;
        self.message = String::new();
        self.open = true;
        self.cancel_requested = false;
    }

    /// Close the dialog.
    pub fn finish(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Latest fraction and message, for hosts that render their own bar.
    pub fn snapshot(&self) -> (f32, &str) {
        (self.fraction, &self.message)
    }

    /// Draw the dialog when open.
    pub fn ui(&mut self, ctx: &egui::Context) {
        if !self.open {
            return;
        }

        let title = self.title.clone();
        let fraction = self.fraction;
        let message = self.message.clone();
        let mut cancel = false;

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.add(egui::ProgressBar::new(fraction).text(message));
                ui.vertical_centered(|ui| {
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if cancel {
            self.cancel_requested = true;
        }
    }
}

impl ProgressSink for ProgressDialog {
    fn update(&mut self, fraction: f32, message: &str) {
        self.fraction = fraction.clamp(0.0, 1.0);
        self.message = message.to_string();
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_requested
    }
}
