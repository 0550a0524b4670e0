use std::time::Instant;

use eframe::egui::{self, Align, Color32, Context, Layout, RichText, Ui};

use crate::sim::Mode;
use crate::sync::ConnectionState;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        self.pump(Instant::now());

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("courier-view");
                    ui.separator();
                    self.draw_stats(ui);
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        self.draw_connection_status(ui);
                        if self.commands.has_pending() {
                            ui.spinner();
                        }
                        if let Some(text) = self.node_count_text() {
                            ui.label(text);
                        }
                    });
                });
            });

        if !self.notices.is_empty() {
            egui::TopBottomPanel::bottom("notices")
                .resizable(false)
                .show(ctx, |ui| self.draw_notices(ui));
        }

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(failure) = self.sync.failure().map(str::to_owned) {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Connection lost");
                    ui.add_space(6.0);
                    ui.label(failure);
                    ui.add_space(10.0);
                    if ui.button("Reconnect").clicked() {
                        self.reconnect();
                    }
                });
            } else if self.sync.snapshot().is_none() {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading(format!("Waiting for simulation state from {}...", self.sync.endpoint()));
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    fn draw_stats(&self, ui: &mut Ui) {
        match self.sync.mode() {
            Mode::Simulation => {
                ui.label(RichText::new("SIMULATION").color(Color32::from_rgb(96, 196, 128)));
            }
            Mode::Training => {
                let since = self
                    .sync
                    .training_since()
                    .map(|timestep| format!(" since t={timestep}"))
                    .unwrap_or_default();
                ui.label(
                    RichText::new(format!("TRAINING{since}"))
                        .color(Color32::from_rgb(232, 167, 72)),
                );
            }
        }

        let Some(snapshot) = self.sync.snapshot() else {
            return;
        };
        ui.separator();
        ui.label(format!("t = {}", snapshot.timestep));
        ui.label(format!("reward {:.2}", snapshot.stats.episode_reward));
        ui.label(format!("delivered {}", snapshot.stats.num_delivered));
        ui.label(format!("avg delivery {:.1}", snapshot.stats.avg_delivery_time));
        if self.paused {
            ui.label(RichText::new("paused").italics());
        }
    }

    fn draw_connection_status(&mut self, ui: &mut Ui) {
        let state = self.sync.state();
        let (text, color) = match state {
            ConnectionState::Open => ("live".to_owned(), Color32::from_rgb(96, 196, 128)),
            ConnectionState::Connecting if self.sync.attempts() == 0 => {
                ("connecting".to_owned(), Color32::from_rgb(200, 200, 120))
            }
            ConnectionState::Connecting => (
                format!("reconnecting (attempt {})", self.sync.attempts()),
                Color32::from_rgb(200, 200, 120),
            ),
            ConnectionState::Closed => match self.sync.reconnect_in(Instant::now()) {
                Some(delay) => (
                    format!("reconnecting in {:.0}s", delay.as_secs_f32().ceil()),
                    Color32::from_rgb(232, 167, 72),
                ),
                None => (state.label().to_owned(), Color32::GRAY),
            },
            ConnectionState::Failed => (state.label().to_owned(), Color32::from_rgb(230, 90, 80)),
        };

        if state == ConnectionState::Failed && ui.small_button("Reconnect").clicked() {
            self.reconnect();
        }
        ui.label(RichText::new(text).color(color));
    }
}
