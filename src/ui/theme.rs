use ratatui::style::Color;

pub const BG_PRIMARY: Color = Color::Rgb(0, 0, 0);
pub const BG_PANEL: Color = Color::Rgb(12, 12, 12);
pub const FG_PRIMARY: Color = Color::Rgb(190, 190, 190);
pub const FG_DIM: Color = Color::Rgb(128, 128, 128);

pub const BAR_BG: Color = Color::Rgb(23, 52, 127);
pub const BAR_TEXT: Color = Color::Rgb(235, 240, 255);
pub const BAR_HIGHLIGHT_BG: Color = Color::Rgb(73, 102, 177);
pub const BAR_HIGHLIGHT_TEXT: Color = Color::Rgb(255, 255, 255);

pub const MENU_BG: Color = Color::Rgb(79, 79, 79);

pub const BORDER_IDLE: Color = Color::Rgb(61, 120, 120);
pub const BORDER_FOCUS: Color = Color::Rgb(187, 94, 0);
pub const PANEL_HIGHLIGHT_BG: Color = Color::Rgb(120, 160, 255);
pub const HIGHLIGHT_FG: Color = Color::Rgb(255, 255, 255);

pub const USER_FG: Color = Color::Cyan;
pub const ASSISTANT_FG: Color = Color::Rgb(235, 235, 235);
pub const SUCCESS_FG: Color = Color::Rgb(120, 220, 140);
pub const ERROR_FG: Color = Color::LightRed;
