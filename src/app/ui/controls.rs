use eframe::egui::{self, DragValue, Ui};

use crate::sim::{Mode, Request, TaskStatus};

use super::super::{NoticeKind, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            self.draw_create_section(ui);
            ui.separator();
            self.draw_run_section(ui);
            ui.separator();
            self.draw_training_section(ui);
            ui.separator();
            self.draw_assign_section(ui);
            ui.separator();
            self.draw_view_section(ui);
        });
    }

    fn draw_create_section(&mut self, ui: &mut Ui) {
        ui.heading("New simulation");
        ui.add_space(4.0);

        let params = &mut self.create_params;
        egui::Grid::new("create_params")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Nodes");
                ui.add(DragValue::new(&mut params.num_nodes).range(1..=500));
                ui.end_row();

                ui.label("Edges");
                ui.add(DragValue::new(&mut params.num_edges).range(0..=5_000));
                ui.end_row();

                ui.label("Drivers");
                ui.add(DragValue::new(&mut params.num_drivers).range(0..=200));
                ui.end_row();

                ui.label("Arrival rate");
                ui.add(
                    DragValue::new(&mut params.arrival_rate)
                        .range(0.0..=10.0)
                        .speed(0.01),
                );
                ui.end_row();
            });
        ui.checkbox(&mut params.init_optimizer, "Initialize optimizer");

        let min_edges = params.num_nodes.saturating_sub(1);
        if params.num_edges < min_edges {
            ui.colored_label(
                ui.visuals().warn_fg_color,
                format!("Needs at least {min_edges} edges to stay connected"),
            );
        }

        let pending = self.commands.is_pending("create_simulation");
        if ui
            .add_enabled(!pending, egui::Button::new("Create simulation"))
            .clicked()
        {
            self.submit(Request::CreateSimulation {
                params: self.create_params.clone(),
            });
        }
    }

    fn draw_run_section(&mut self, ui: &mut Ui) {
        ui.heading("Run");
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            let (label, request) = if self.paused {
                ("Resume", Request::Resume)
            } else {
                ("Pause", Request::Pause)
            };
            let pending = self.commands.is_pending("pause") || self.commands.is_pending("resume");
            if ui.add_enabled(!pending, egui::Button::new(label)).clicked() {
                self.submit(request);
            }
            if pending {
                ui.spinner();
            }
        });

        ui.horizontal(|ui| {
            ui.label("Speed");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.speed_input)
                    .desired_width(70.0)
                    .hint_text("steps/s"),
            );
            let submitted =
                response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
            if ui.button("Apply").clicked() || submitted {
                self.submit_speed();
            }
        });
        match self.speed {
            Some(speed) => ui.label(format!("current speed: {speed} steps/s")),
            None => ui.label("current speed: server default"),
        };
    }

    fn submit_speed(&mut self) {
        let raw = self.speed_input.trim();
        match raw.parse::<f64>() {
            Ok(speed) => self.submit(Request::SetSpeed { speed }),
            Err(_) => {
                let message = format!("set_speed: invalid input: {raw:?} is not a number");
                self.push_notice(NoticeKind::Error, message);
            }
        }
    }

    fn draw_training_section(&mut self, ui: &mut Ui) {
        ui.heading("Training");
        ui.add_space(4.0);

        let training = self.sync.mode() == Mode::Training;
        ui.horizontal(|ui| {
            ui.label("Timesteps");
            ui.add(
                DragValue::new(&mut self.training_timesteps)
                    .range(1..=10_000_000)
                    .speed(100.0),
            );
        });

        let pending = self.commands.is_pending("start_training");
        if ui
            .add_enabled(!training && !pending, egui::Button::new("Start training"))
            .clicked()
        {
            self.submit(Request::StartTraining {
                timesteps: self.training_timesteps,
            });
        }
        if training {
            ui.label("Live updates are paused until training ends.");
        }

        ui.horizontal(|ui| {
            if ui.button("Check optimizer").clicked() {
                self.submit(Request::Optimizer { initialize: false });
            }
            if ui.button("Initialize optimizer").clicked() {
                self.submit(Request::Optimizer { initialize: true });
            }
        });
        ui.label(match self.optimizer_ready {
            Some(true) => "optimizer: ready",
            Some(false) => "optimizer: not initialized",
            None => "optimizer: unknown",
        });
    }

    fn draw_assign_section(&mut self, ui: &mut Ui) {
        ui.heading("Assign task");
        ui.add_space(4.0);

        let (tasks, drivers) = match self.sync.snapshot() {
            Some(snapshot) => (
                snapshot
                    .tasks
                    .iter()
                    .filter(|task| task.status != TaskStatus::Delivered)
                    .map(|task| {
                        (
                            task.id.clone(),
                            format!(
                                "{}  {} → {}  ({})",
                                task.id,
                                task.pickup_node,
                                task.dropoff_node,
                                task.status.label()
                            ),
                        )
                    })
                    .collect::<Vec<_>>(),
                snapshot
                    .drivers
                    .iter()
                    .map(|driver| {
                        let state = if driver.is_idle() { "idle" } else { "busy" };
                        (driver.id.clone(), format!("{}  at {}  ({state})", driver.id, driver.current_node))
                    })
                    .collect::<Vec<_>>(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let task_text = self.selected_task.clone().unwrap_or_else(|| "pick a task".to_owned());
        egui::ComboBox::from_id_salt("task_select")
            .selected_text(task_text)
            .width(220.0)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.selected_task, None, "none");
                for (id, label) in &tasks {
                    ui.selectable_value(&mut self.selected_task, Some(id.clone()), label.as_str());
                }
            });

        let driver_text = self
            .selected_driver
            .clone()
            .unwrap_or_else(|| "pick a driver".to_owned());
        egui::ComboBox::from_id_salt("driver_select")
            .selected_text(driver_text)
            .width(220.0)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.selected_driver, None, "none");
                for (id, label) in &drivers {
                    ui.selectable_value(&mut self.selected_driver, Some(id.clone()), label.as_str());
                }
            });

        let ready = self.selected_task.is_some() && self.selected_driver.is_some();
        if ui.add_enabled(ready, egui::Button::new("Assign")).clicked()
            && let (Some(task_id), Some(driver_id)) =
                (self.selected_task.clone(), self.selected_driver.clone())
        {
            self.submit(Request::AssignTask { task_id, driver_id });
        }
    }

    fn draw_view_section(&mut self, ui: &mut Ui) {
        ui.heading("View");
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            ui.label("Search");
            ui.text_edit_singleline(&mut self.search);
        });
        if let Some(matches) = &self.search_match_cache
            && !self.search.trim().is_empty()
        {
            ui.label(format!("{} matching nodes", matches.matches.len()));
        }

        if ui.button("Reset view").clicked() {
            self.reset_view();
        }
        ui.label("Drag to pan, scroll to zoom.");
    }
}
