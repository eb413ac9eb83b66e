//! Activity feed panel.
//!
//! Collects what the editor did (loads, saves, assembly batches) with
//! filtering by level. Everything pushed here is mirrored to the `log`
//! facade so headless runs see the same feed on stderr.

use std::collections::VecDeque;
use std::time::Instant;

use egui::Context as EguiContext;

use super::{Panel, PanelId};
use crate::core::EditorState;

/// Level of an activity entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityLevel {
    Info,
    Warning,
    Error,
}

impl ActivityLevel {
    pub fn color(&self) -> egui::Color32 {
        match self {
            ActivityLevel::Info => egui::Color32::WHITE,
            ActivityLevel::Warning => egui::Color32::YELLOW,
            ActivityLevel::Error => egui::Color32::from_rgb(255, 100, 100),
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ActivityLevel::Info => "[INFO]",
            ActivityLevel::Warning => "[WARN]",
            ActivityLevel::Error => "[ERROR]",
        }
    }
}

/// A single activity entry.
#[derive(Clone, Debug)]
pub struct ActivityEntry {
    pub level: ActivityLevel,
    pub message: String,
    pub timestamp: Instant,
    pub count: u32, // For collapsed duplicate messages
}

impl ActivityEntry {
    pub fn new(level: ActivityLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Instant::now(),
            count: 1,
        }
    }
}

/// Outcome of the most recent assembly batch, pinned above the feed.
#[derive(Clone, Copy, Debug)]
pub struct BatchSummary {
    pub assembled: usize,
    pub errors: usize,
    pub when: Instant,
}

/// Activity feed state.
#[derive(Debug)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    max_entries: usize,
    last_batch: Option<BatchSummary>,

    // Filters
    pub show_info: bool,
    pub show_warnings: bool,
    pub show_errors: bool,
    pub filter_text: String,

    // Options
    pub auto_scroll: bool,
    pub collapse_duplicates: bool,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: 1000,
            last_batch: None,
            show_info: true,
            show_warnings: true,
            show_errors: true,
            filter_text: String::new(),
            auto_scroll: true,
            collapse_duplicates: true,
        }
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Default::default()
        }
    }

    /// Change the retention limit, trimming oldest entries if needed.
    pub fn set_capacity(&mut self, max_entries: usize) {
        self.max_entries = max_entries;
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Add an entry with the given level.
    pub fn push(&mut self, level: ActivityLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            ActivityLevel::Info => log::info!(target: "stagehand::activity", "{}", message),
            ActivityLevel::Warning => log::warn!(target: "stagehand::activity", "{}", message),
            ActivityLevel::Error => log::error!(target: "stagehand::activity", "{}", message),
        }

        if self.collapse_duplicates {
            if let Some(last) = self.entries.back_mut() {
                if last.level == level && last.message == message {
                    last.count += 1;
                    last.timestamp = Instant::now();
                    return;
                }
            }
        }

        self.entries.push_back(ActivityEntry::new(level, message));
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ActivityLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(ActivityLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ActivityLevel::Error, message);
    }

    /// Record the outcome of an assembly batch.
    pub fn batch(&mut self, assembled: usize, errors: usize) {
        self.last_batch = Some(BatchSummary {
            assembled,
            errors,
            when: Instant::now(),
        });
        let message = format!("Assembly: {} template(s), {} error(s)", assembled, errors);
        if errors > 0 {
            self.error(message);
        } else {
            self.info(message);
        }
    }

    /// The most recent batch outcome, if any batch has run.
    pub fn last_batch(&self) -> Option<&BatchSummary> {
        self.last_batch.as_ref()
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_batch = None;
    }

    /// Check if an entry should be shown based on current filters.
    pub fn should_show(&self, entry: &ActivityEntry) -> bool {
        let level_ok = match entry.level {
            ActivityLevel::Info => self.show_info,
            ActivityLevel::Warning => self.show_warnings,
            ActivityLevel::Error => self.show_errors,
        };

        let filter_ok = self.filter_text.is_empty()
            || entry
                .message
                .to_lowercase()
                .contains(&self.filter_text.to_lowercase());

        level_ok && filter_ok
    }

    /// Get all entries.
    pub fn entries(&self) -> &VecDeque<ActivityEntry> {
        &self.entries
    }

    /// Get filtered entries.
    pub fn filtered_entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter().filter(|e| self.should_show(e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries by level, duplicates included.
    pub fn count_by_level(&self) -> (usize, usize, usize) {
        let mut info = 0;
        let mut warn = 0;
        let mut error = 0;

        for entry in &self.entries {
            match entry.level {
                ActivityLevel::Info => info += entry.count as usize,
                ActivityLevel::Warning => warn += entry.count as usize,
                ActivityLevel::Error => error += entry.count as usize,
            }
        }

        (info, warn, error)
    }
}

/// Bottom panel rendering the activity feed.
#[derive(Default)]
pub struct ActivityPanel;

impl Panel for ActivityPanel {
    fn id(&self) -> PanelId {
        PanelId("activity")
    }

    fn name(&self) -> &str {
        "Activity"
    }

    fn ui(&mut self, ctx: &EguiContext, state: &mut EditorState) {
        egui::TopBottomPanel::bottom("activity_panel")
            .default_height(180.0)
            .resizable(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Activity");
                    ui.separator();
                    if ui.small_button("Clear").clicked() {
                        state.activity.clear();
                    }
                    ui.checkbox(&mut state.activity.show_info, "Info");
                    ui.checkbox(&mut state.activity.show_warnings, "Warn");
                    ui.checkbox(&mut state.activity.show_errors, "Error");
                    ui.separator();
                    ui.label("Filter:");
                    ui.text_edit_singleline(&mut state.activity.filter_text);
                });

                if let Some(batch) = state.activity.last_batch().copied() {
                    ui.horizontal(|ui| {
                        let color = if batch.errors > 0 {
                            ActivityLevel::Error.color()
                        } else {
                            ActivityLevel::Info.color()
                        };
                        ui.colored_label(
                            color,
                            format!(
                                "Last assembly: {} template(s), {} error(s)",
                                batch.assembled, batch.errors
                            ),
                        );
                    });
                }

                ui.separator();

                // Collect display data to avoid borrow issues
                let entries: Vec<(ActivityLevel, String, u32)> = state
                    .activity
                    .filtered_entries()
                    .map(|e| (e.level, e.message.clone(), e.count))
                    .collect();

                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .stick_to_bottom(state.activity.auto_scroll)
                    .show(ui, |ui| {
                        for (level, message, count) in entries {
                            ui.horizontal(|ui| {
                                ui.colored_label(level.color(), level.prefix());
                                if count > 1 {
                                    ui.label(format!("{} (x{})", message, count));
                                } else {
                                    ui.label(message);
                                }
                            });
                        }
                    });
            });
    }
}
