use crate::app::AppContext;
use crate::call::CallerInfo;
use crate::error::Result;
use crate::launch::{LaunchRequest, PendingCall};
use crate::ui::caller_list::CallerList;
use crate::ui::{call_window, dialogs};
use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use gtk4::gio;
use std::rc::Rc;

pub fn show_main_window(app: &Application, ctx: Rc<AppContext>) {
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Fake Call")
        .default_width(420)
        .default_height(640)
        .build();

    let overlay = adw::ToastOverlay::new();
    let callers = Rc::new(CallerList::new());
    overlay.set_child(Some(&callers.widget()));

    let container = gtk::Box::new(gtk::Orientation::Vertical, 0);
    let header = adw::HeaderBar::new();
    let title = gtk::Label::new(Some("Fake Call"));
    header.set_title_widget(Some(&title));
    let add_btn = gtk::Button::from_icon_name("list-add-symbolic");
    add_btn.set_tooltip_text(Some("Add caller"));
    add_btn.add_css_class("suggested-action");
    header.pack_start(&add_btn);
    container.append(&header);
    container.append(&overlay);
    window.set_content(Some(&container));

    let refresh: Rc<dyn Fn()> = {
        let ctx = ctx.clone();
        let callers = callers.clone();
        Rc::new(move || callers.set_items(ctx.roster.borrow().entries()))
    };
    refresh();

    // Add: pick audio, then name it. The file is only copied once the name is saved.
    {
        let window = window.clone();
        let overlay = overlay.clone();
        let ctx = ctx.clone();
        let refresh = refresh.clone();
        add_btn.connect_clicked(move |_| {
            overlay.add_toast(adw::Toast::new("Select voice file first"));
            let window_for_name = window.clone();
            let overlay = overlay.clone();
            let ctx = ctx.clone();
            let refresh = refresh.clone();
            pick_audio(&window, move |file| {
                let overlay = overlay.clone();
                let ctx = ctx.clone();
                let refresh = refresh.clone();
                dialogs::ask_caller_name(&window_for_name, move |name| {
                    match import_caller(&ctx, &file, &name) {
                        Ok(Some(added)) => {
                            refresh();
                            overlay.add_toast(adw::Toast::new(&format!("Added {added}")));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            log::error!("Importing {} failed: {e}", file.uri());
                            overlay.add_toast(adw::Toast::new("Could not import the audio file"));
                        }
                    }
                });
            });
        });
    }

    // Click: ask for a delay, then hide and schedule the call.
    {
        let app = app.clone();
        let window = window.clone();
        let overlay = overlay.clone();
        let ctx = ctx.clone();
        callers.connect_activated(move |index| {
            let Some(entry) = ctx.roster.borrow().entries().get(index).cloned() else {
                return;
            };
            let app = app.clone();
            let window_for_hide = window.clone();
            let overlay = overlay.clone();
            let ctx_for_call = ctx.clone();
            let name = entry.name.clone();
            dialogs::ask_delay(&window, &name, ctx.settings.default_delay_secs, move |input| {
                let request = LaunchRequest::new(
                    CallerInfo::from(&entry),
                    &input,
                    ctx_for_call.settings.default_delay_secs,
                );
                schedule_call(&app, &window_for_hide, &overlay, ctx_for_call.clone(), request);
            });
        });
    }

    // Long press: confirm, then drop the caller and its audio.
    {
        let window = window.clone();
        let overlay = overlay.clone();
        let ctx = ctx.clone();
        let refresh = refresh.clone();
        callers.connect_delete_requested(move |index| {
            let Some(name) = ctx.roster.borrow().entries().get(index).map(|e| e.name.clone()) else {
                return;
            };
            let overlay = overlay.clone();
            let ctx = ctx.clone();
            let refresh = refresh.clone();
            dialogs::confirm_delete(&window, &name, move || {
                let result = ctx.roster.borrow_mut().delete(index);
                match result {
                    Ok(removed) => log::info!("Removed caller {}", removed.name),
                    Err(e) => {
                        log::error!("Deleting caller {index} failed: {e}");
                        overlay.add_toast(adw::Toast::new("Could not delete caller"));
                    }
                }
                refresh();
            });
        });
    }

    window.present();
}

fn pick_audio<F: Fn(gio::File) + 'static>(window: &adw::ApplicationWindow, on_pick: F) {
    let filter = gtk::FileFilter::new();
    filter.set_name(Some("Audio"));
    filter.add_mime_type("audio/*");
    let filters = gio::ListStore::new::<gtk::FileFilter>();
    filters.append(&filter);

    let dialog = gtk::FileDialog::builder()
        .title("Choose a voice message")
        .modal(true)
        .filters(&filters)
        .default_filter(&filter)
        .build();
    dialog.open(Some(window), gio::Cancellable::NONE, move |res| match res {
        Ok(file) => on_pick(file),
        Err(e) if e.matches(gtk::DialogError::Dismissed) => {}
        Err(e) => log::warn!("File picker failed: {e}"),
    });
}

/// Copies the picked file into the audio directory and records the caller.
/// Returns the stored name, or `None` when the name was empty.
fn import_caller(ctx: &AppContext, file: &gio::File, name: &str) -> Result<Option<String>> {
    if name.is_empty() {
        return Ok(None);
    }
    let stream = file.read(gio::Cancellable::NONE)?;
    let extension = file
        .basename()
        .and_then(|b| b.extension().map(|e| e.to_string_lossy().into_owned()));
    let mut roster = ctx.roster.borrow_mut();
    let added = roster.add_caller(name, stream.into_read(), extension.as_deref())?;
    Ok(added.map(|e| e.name.clone()))
}

fn schedule_call(
    app: &Application,
    window: &adw::ApplicationWindow,
    overlay: &adw::ToastOverlay,
    ctx: Rc<AppContext>,
    request: LaunchRequest,
) {
    let LaunchRequest { caller, delay } = request;
    log::info!("Call from {} in {}s", caller.display_name(), delay.as_secs());

    let toast = adw::Toast::builder()
        .title(format!("Waiting {}s…", delay.as_secs()))
        .button_label("Cancel")
        .timeout(0)
        .build();

    let minimize = ctx.settings.minimize_on_schedule;
    // Keeps the app running while every window is hidden or closed.
    let hold = app.hold();
    let pending = {
        let app = app.clone();
        let toast = toast.clone();
        PendingCall::schedule_holding(delay, hold, move || {
            toast.dismiss();
            call_window::show_call_window(&app, ctx, caller);
        })
    };

    {
        let window = window.clone();
        toast.connect_button_clicked(move |_| {
            if pending.cancel() {
                log::info!("Pending call cancelled");
                window.present();
            }
        });
    }
    overlay.add_toast(toast);

    if minimize {
        window.minimize();
    }
}
