/// Interactive terminal front end: main menu, settings menu, and the
/// weighing calculation flow. All user-facing strings come from the
/// language table in [`crate::settings`].
pub mod cli_main;
pub mod weighing_menu;
