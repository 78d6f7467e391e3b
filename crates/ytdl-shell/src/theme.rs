use ratatui::style::{Color, Modifier, Style};

#[derive(Clone, Copy, Debug)]
pub struct ShellTheme {
    pub bar: Color,
    pub surface: Color,
    pub border: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub ok: Color,
    pub warn: Color,
    pub disabled: Color,
}

pub fn shell_theme() -> ShellTheme {
    ShellTheme {
        bar: Color::Rgb(25, 118, 210),
        surface: Color::Rgb(17, 24, 39),
        border: Color::Rgb(71, 85, 105),
        title: Color::Rgb(240, 246, 252),
        text: Color::Rgb(226, 232, 240),
        muted: Color::Rgb(148, 163, 184),
        accent: Color::Rgb(56, 189, 248),
        ok: Color::Rgb(34, 197, 94),
        warn: Color::Rgb(245, 158, 11),
        disabled: Color::Rgb(82, 90, 104),
    }
}

impl ShellTheme {
    pub fn heading(self) -> Style {
        Style::new().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn cursor(self) -> Style {
        Style::new().add_modifier(Modifier::REVERSED)
    }
}

pub mod icons {
    pub const MENU: &str = "≡";
    pub const COLLAPSE: &str = "«";
    pub const STORAGE: &str = "▤";
    pub const SERVER: &str = "⇄";
    pub const BELL: &str = "◔";
    pub const HOME: &str = "⌂";
    pub const SETTINGS: &str = "⚙";
    pub const CURSOR: &str = ">";
}
