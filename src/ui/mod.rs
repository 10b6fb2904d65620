pub mod call_window;
pub mod caller_list;
pub mod dialogs;
pub mod main_window;
