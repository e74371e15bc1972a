use super::weighing_menu::weighing_menu;
use crate::settings::{SETTINGS_FILE, Settings, Theme};
use log::error;
use std::io::{self, Write};

/* colors
Blue / bright cyan (theme dependent) - title text

Yellow - menu options (1, 2, 0)

Cyan - "Enter your choice:" prompt

Reset (\x1b[0m) - returns to normal color after each colored section
*/

pub fn run_interactive_menu() {
    let mut settings = Settings::load(SETTINGS_FILE);
    loop {
        show_main_menu(&settings);
        let choice = get_user_input();

        match choice.trim() {
            "1" => weighing_menu(&settings),
            "2" => settings_menu(&mut settings),
            "0" => {
                println!("{}", settings.label("goodbye"));
                break;
            }
            _ => println!("{}", settings.label("invalid_choice")),
        }
    }
}

fn title_color(settings: &Settings) -> &'static str {
    match settings.theme {
        Theme::Light => "\x1b[34m",
        Theme::Dark => "\x1b[96m",
    }
}

fn show_main_menu(settings: &Settings) {
    println!(
        "{}\n {} - {}\n\x1b[0m",
        title_color(settings),
        settings.label("app_title"),
        settings.label("main_menu"),
    );
    println!("\x1b[33m1. {}\x1b[0m", settings.label("new_calculation"));
    println!("\x1b[33m2. {}\x1b[0m", settings.label("settings"));
    println!("\x1b[33m0. {}\x1b[0m", settings.label("exit"));
    print!("\x1b[36m{}\x1b[0m", settings.label("enter_choice"));
    io::stdout().flush().unwrap_or(());
}

fn settings_menu(settings: &mut Settings) {
    println!(
        "{}\n {}\n\x1b[0m",
        title_color(settings),
        settings.label("settings")
    );
    println!("{}: 1. English  2. 日本語", settings.label("language"));
    match prompt(settings.label("enter_choice")).as_str() {
        "1" => settings.lang = "en".to_string(),
        "2" => settings.lang = "ja".to_string(),
        _ => {}
    }

    println!("{}: 1. Light  2. Dark", settings.label("theme"));
    match prompt(settings.label("enter_choice")).as_str() {
        "1" => settings.theme = Theme::Light,
        "2" => settings.theme = Theme::Dark,
        _ => {}
    }

    match settings.save(SETTINGS_FILE) {
        Ok(()) => println!("{}", settings.label("settings_saved")),
        Err(e) => error!("failed to save settings: {}", e),
    }
}

pub fn get_user_input() -> String {
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .expect("Failed to read input");
    input
}

/// Prints a colored prompt and returns the trimmed reply.
pub fn prompt(text: &str) -> String {
    print!("\x1b[36m{}\x1b[0m", text);
    io::stdout().flush().unwrap_or(());
    get_user_input().trim().to_string()
}
