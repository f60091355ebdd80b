use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const IPV4_ADDR: Color = Color::BrightBlue;
pub const MAC_ADDR: Color = Color::BrightYellow;
pub const VENDOR: Color = Color::Magenta;

pub const FAST: Color = Color::Green;
pub const MODERATE: Color = Color::Yellow;
pub const SLOW: Color = Color::Red;
