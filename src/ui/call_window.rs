use crate::app::AppContext;
use crate::call::devices::{GtkDevices, find_default_ringtone};
use crate::call::{CallNotice, CallPhase, CallSession, CallerInfo, format_call_duration};
use adw::prelude::*;
use adw::Application;
use gtk4 as gtk;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;
use std::time::Duration;

const CALL_CSS: &str = r#"
.call-screen {
    background: linear-gradient(#1d2b3a, #0b1016);
    color: #ffffff;
}
.call-screen .dim-label {
    color: rgba(255, 255, 255, 0.7);
}
.call-round {
    min-width: 72px;
    min-height: 72px;
    border-radius: 9999px;
}
.call-answer {
    background: #2ec27e;
    color: #ffffff;
}
.vibrating {
    animation: call-shake 120ms linear infinite;
}
@keyframes call-shake {
    0% { transform: rotate(0deg); }
    25% { transform: rotate(-6deg); }
    75% { transform: rotate(6deg); }
    100% { transform: rotate(0deg); }
}
"#;

const KEYPAD: [&str; 12] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "*", "0", "#"];
const DIMMED: f64 = 0.5;

fn install_css() {
    static CSS: Once = Once::new();
    CSS.call_once(|| {
        let Some(display) = gtk::gdk::Display::default() else {
            log::warn!("No display, call screen unstyled");
            return;
        };
        let provider = gtk::CssProvider::new();
        provider.load_from_data(CALL_CSS);
        gtk::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    });
}

fn round_button(icon: &str, tooltip: &str) -> gtk::Button {
    let button = gtk::Button::from_icon_name(icon);
    button.set_tooltip_text(Some(tooltip));
    button.add_css_class("call-round");
    button
}

fn keypad_grid(dialed: &gtk::Label) -> gtk::Grid {
    let grid = gtk::Grid::builder()
        .row_spacing(8)
        .column_spacing(8)
        .halign(gtk::Align::Center)
        .visible(false)
        .build();
    for (i, key) in KEYPAD.iter().enumerate() {
        let button = gtk::Button::with_label(key);
        button.add_css_class("call-round");
        button.add_css_class("flat");
        let dialed = dialed.clone();
        button.connect_clicked(move |_| {
            let mut text = dialed.text().to_string();
            text.push_str(key);
            dialed.set_label(&text);
        });
        grid.attach(&button, (i % 3) as i32, (i / 3) as i32, 1, 1);
    }
    grid
}

pub fn show_call_window(app: &Application, ctx: Rc<AppContext>, caller: CallerInfo) {
    install_css();

    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("Incoming call")
        .default_width(400)
        .default_height(720)
        .build();
    let overlay = adw::ToastOverlay::new();

    let root = gtk::Box::new(gtk::Orientation::Vertical, 16);
    root.add_css_class("call-screen");
    root.set_margin_top(48);
    root.set_margin_bottom(48);
    root.set_margin_start(24);
    root.set_margin_end(24);

    let avatar = adw::Avatar::new(128, Some(caller.display_name()), true);
    avatar.set_halign(gtk::Align::Center);
    root.append(&avatar);

    let name = gtk::Label::new(Some(caller.display_name()));
    name.add_css_class("title-1");
    root.append(&name);

    let status = gtk::Label::new(Some("Incoming call…"));
    status.add_css_class("dim-label");
    root.append(&status);

    let dialed = gtk::Label::new(None);
    dialed.add_css_class("title-3");
    root.append(&dialed);

    let spacer = gtk::Box::new(gtk::Orientation::Vertical, 0);
    spacer.set_vexpand(true);
    root.append(&spacer);

    let keypad = keypad_grid(&dialed);
    root.append(&keypad);

    let controls = gtk::Box::new(gtk::Orientation::Horizontal, 24);
    controls.set_halign(gtk::Align::Center);
    controls.set_visible(false);
    let speaker_btn = round_button("audio-speakers-symbolic", "Speaker");
    let mute_btn = round_button("audio-volume-muted-symbolic", "Mute");
    let keypad_btn = round_button("input-dialpad-symbolic", "Keypad");
    speaker_btn.set_opacity(DIMMED);
    mute_btn.set_opacity(DIMMED);
    controls.append(&speaker_btn);
    controls.append(&mute_btn);
    controls.append(&keypad_btn);
    root.append(&controls);

    let answer_btn = round_button("call-start-symbolic", "Answer");
    answer_btn.add_css_class("call-answer");
    answer_btn.set_halign(gtk::Align::Center);
    root.append(&answer_btn);

    let hangup_btn = round_button("call-stop-symbolic", "Hang up");
    hangup_btn.add_css_class("destructive-action");
    hangup_btn.set_halign(gtk::Align::Center);
    hangup_btn.set_visible(false);
    root.append(&hangup_btn);

    overlay.set_child(Some(&root));
    window.set_content(Some(&overlay));

    let devices = GtkDevices::new(find_default_ringtone(ctx.settings.ringtone.as_deref()), &avatar);
    let session = Rc::new(RefCell::new(CallSession::open(
        devices,
        caller,
        ctx.paths.audio_dir.clone(),
    )));
    let ticker: Rc<RefCell<Option<glib::SourceId>>> = Rc::new(RefCell::new(None));

    {
        let session = session.clone();
        let ticker = ticker.clone();
        let overlay = overlay.clone();
        let status = status.clone();
        let controls = controls.clone();
        let hangup_btn = hangup_btn.clone();
        let mute_btn = mute_btn.clone();
        answer_btn.connect_clicked(move |btn| {
            let notice = session.borrow_mut().answer();
            if session.borrow().phase() != CallPhase::Active {
                return;
            }
            btn.set_visible(false);
            hangup_btn.set_visible(true);
            controls.set_visible(true);
            mute_btn.set_sensitive(session.borrow().is_voice_playing());
            status.set_label(&format_call_duration(Duration::ZERO));
            if let Some(notice) = notice {
                if let CallNotice::AudioMissing(path) = &notice {
                    log::warn!("Voice clip missing at {}", path.display());
                }
                overlay.add_toast(adw::Toast::new(&notice.to_string()));
            }
            start_ticker(&ticker, session.clone(), status.clone());
        });
    }

    {
        let session = session.clone();
        speaker_btn.connect_clicked(move |btn| {
            if let Some(on) = session.borrow_mut().toggle_speaker() {
                btn.set_opacity(if on { 1.0 } else { DIMMED });
            }
        });
    }

    {
        let session = session.clone();
        mute_btn.connect_clicked(move |btn| {
            if let Some(muted) = session.borrow_mut().toggle_mute() {
                btn.set_opacity(if muted { 1.0 } else { DIMMED });
            }
        });
    }

    keypad_btn.connect_clicked(move |btn| {
        let show = !keypad.is_visible();
        keypad.set_visible(show);
        btn.set_opacity(if show { 1.0 } else { DIMMED });
    });

    {
        let session = session.clone();
        let window = window.downgrade();
        hangup_btn.connect_clicked(move |_| {
            session.borrow_mut().hang_up();
            if let Some(window) = window.upgrade() {
                window.close();
            }
        });
    }

    window.connect_close_request(move |_| {
        if let Some(id) = ticker.borrow_mut().take() {
            id.remove();
        }
        session.borrow_mut().teardown();
        glib::Propagation::Proceed
    });

    if ctx.settings.fullscreen_call {
        window.fullscreen();
    }
    window.present();
}

fn start_ticker<D>(
    slot: &Rc<RefCell<Option<glib::SourceId>>>,
    session: Rc<RefCell<CallSession<D>>>,
    status: gtk::Label,
) where
    D: crate::call::CallDevices + 'static,
{
    let own_slot = slot.clone();
    let id = glib::timeout_add_seconds_local(1, move || {
        let session = session.borrow();
        match session.elapsed() {
            Some(elapsed) if session.phase() == CallPhase::Active => {
                status.set_label(&format_call_duration(elapsed));
                glib::ControlFlow::Continue
            }
            _ => {
                own_slot.borrow_mut().take();
                glib::ControlFlow::Break
            }
        }
    });
    *slot.borrow_mut() = Some(id);
}
