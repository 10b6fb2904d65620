mod app;
mod call;
mod error;
mod launch;
mod roster;
mod storage;
mod ui;

use adw::prelude::*;
use adw::Application;

fn main() -> glib::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Application::builder()
        .application_id("com.example.FakeCallAngel")
        .build();
    app.connect_activate(crate::app::build_ui);
    app.run()
}
