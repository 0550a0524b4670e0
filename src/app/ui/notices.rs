use eframe::egui::{Color32, RichText, Ui};

use super::super::{NoticeKind, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_notices(&mut self, ui: &mut Ui) {
        let mut dismissed = None;

        for notice in self.notices.iter().rev() {
            ui.horizontal(|ui| {
                let color = match notice.kind {
                    NoticeKind::Info => Color32::from_rgb(150, 200, 240),
                    NoticeKind::Error => Color32::from_rgb(240, 120, 110),
                };
                if ui.small_button("x").clicked() {
                    dismissed = Some(notice.id);
                }
                ui.label(RichText::new(&notice.text).color(color));
            });
        }

        if let Some(id) = dismissed {
            self.dismiss_notice(id);
        }
    }
}
