//! The three prompts the roster window shows: name a caller, pick a delay,
//! confirm a delete.

use adw::prelude::*;
use gtk4 as gtk;

fn prompt(parent: &impl IsA<gtk::Window>, heading: &str, body: Option<&str>) -> adw::MessageDialog {
    let dialog = adw::MessageDialog::builder()
        .transient_for(parent)
        .modal(true)
        .heading(heading)
        .build();
    if let Some(body) = body {
        dialog.set_body(body);
    }
    dialog
}

fn text_entry(placeholder: &str) -> gtk::Entry {
    let entry = gtk::Entry::new();
    entry.set_placeholder_text(Some(placeholder));
    entry.set_activates_default(true);
    entry.set_hexpand(true);
    entry
}

pub fn ask_caller_name<F: Fn(String) + 'static>(parent: &impl IsA<gtk::Window>, on_save: F) {
    let dialog = prompt(parent, "Name this Caller", Some("For example: Mom"));
    let entry = text_entry("Caller name");
    dialog.set_extra_child(Some(&entry));
    dialog.add_responses(&[("cancel", "Cancel"), ("save", "Save")]);
    dialog.set_response_appearance("save", adw::ResponseAppearance::Suggested);
    dialog.set_default_response(Some("save"));
    dialog.set_close_response("cancel");

    dialog.connect_response(None, move |_, response| {
        if response == "save" {
            on_save(entry.text().to_string());
        }
    });
    dialog.present();
}

pub fn ask_delay<F: Fn(String) + 'static>(
    parent: &impl IsA<gtk::Window>,
    caller_name: &str,
    default_secs: u32,
    on_start: F,
) {
    let dialog = prompt(
        parent,
        &format!("Call from {caller_name}"),
        Some("Enter delay in seconds:"),
    );
    let entry = text_entry(&default_secs.to_string());
    entry.set_input_purpose(gtk::InputPurpose::Digits);
    dialog.set_extra_child(Some(&entry));
    dialog.add_responses(&[("cancel", "Cancel"), ("start", "Start")]);
    dialog.set_response_appearance("start", adw::ResponseAppearance::Suggested);
    dialog.set_default_response(Some("start"));
    dialog.set_close_response("cancel");

    dialog.connect_response(None, move |_, response| {
        if response == "start" {
            on_start(entry.text().to_string());
        }
    });
    dialog.present();
}

pub fn confirm_delete<F: Fn() + 'static>(parent: &impl IsA<gtk::Window>, caller_name: &str, on_confirm: F) {
    let dialog = prompt(
        parent,
        "Delete Caller?",
        Some(&format!("Are you sure you want to remove {caller_name}?")),
    );
    dialog.add_responses(&[("no", "No"), ("yes", "Yes")]);
    dialog.set_response_appearance("yes", adw::ResponseAppearance::Destructive);
    dialog.set_default_response(Some("no"));
    dialog.set_close_response("no");

    dialog.connect_response(None, move |_, response| {
        if response == "yes" {
            on_confirm();
        }
    });
    dialog.present();
}
