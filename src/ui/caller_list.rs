use crate::roster::CallerEntry;
use adw::prelude::*;
use gtk4 as gtk;
use std::rc::Rc;

pub struct CallerList {
    root: gtk::ScrolledWindow,
    list: gtk::ListBox,
}

impl CallerList {
    pub fn new() -> Self {
        let list = gtk::ListBox::new();
        list.set_selection_mode(gtk::SelectionMode::None);
        list.add_css_class("boxed-list");
        list.set_valign(gtk::Align::Start);
        list.set_margin_top(12);
        list.set_margin_bottom(12);
        list.set_margin_start(12);
        list.set_margin_end(12);

        let placeholder = gtk::Label::new(Some("No callers yet. Add one with +."));
        placeholder.add_css_class("dim-label");
        placeholder.set_margin_top(24);
        placeholder.set_margin_bottom(24);
        list.set_placeholder(Some(&placeholder));

        let root = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .child(&list)
            .build();

        Self { root, list }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    pub fn set_items(&self, items: &[CallerEntry]) {
        while let Some(row) = self.list.row_at_index(0) {
            self.list.remove(&row);
        }
        for caller in items {
            let row = adw::ActionRow::builder()
                .title(caller.name.as_str())
                .subtitle(caller.audio_file.as_str())
                .use_markup(false)
                .activatable(true)
                .build();
            row.add_suffix(&gtk::Image::from_icon_name("call-start-symbolic"));
            self.list.append(&row);
        }
    }

    /// Plain click on a row.
    pub fn connect_activated<F: Fn(usize) + 'static>(&self, f: F) {
        self.list.connect_row_activated(move |_, row| {
            if let Ok(index) = usize::try_from(row.index()) {
                f(index);
            }
        });
    }

    /// Long press, or secondary click, on a row.
    pub fn connect_delete_requested<F: Fn(usize) + 'static>(&self, f: F) {
        let f = Rc::new(f);

        let long_press = gtk::GestureLongPress::new();
        {
            let list = self.list.downgrade();
            let f = f.clone();
            long_press.connect_pressed(move |gesture, _, y| {
                if let Some(index) = list.upgrade().and_then(|l| row_index_at(&l, y)) {
                    gesture.set_state(gtk::EventSequenceState::Claimed);
                    f(index);
                }
            });
        }
        self.list.add_controller(long_press);

        let secondary = gtk::GestureClick::builder()
            .button(gtk::gdk::BUTTON_SECONDARY)
            .build();
        {
            let list = self.list.downgrade();
            secondary.connect_pressed(move |gesture, _, _, y| {
                if let Some(index) = list.upgrade().and_then(|l| row_index_at(&l, y)) {
                    gesture.set_state(gtk::EventSequenceState::Claimed);
                    f(index);
                }
            });
        }
        self.list.add_controller(secondary);
    }
}

fn row_index_at(list: &gtk::ListBox, y: f64) -> Option<usize> {
    let row = list.row_at_y(y as i32)?;
    usize::try_from(row.index()).ok()
}
