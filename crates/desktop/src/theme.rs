use iced::color;
use iced::theme::Palette;
use iced::{Color, Theme};

use crate::settings::Appearance;

/// Base colors that differ between variants; status colors are shared.
struct Swatch {
    background: Color,
    text: Color,
    primary: Color,
    danger: Color,
}

fn dark() -> Swatch {
    Swatch {
        background: color!(0x1b, 0x1d, 0x21),
        text: color!(0xd8, 0xd8, 0xdc),
        primary: color!(0x3f, 0xb8, 0xaf),
        danger: color!(0xff, 0x5a, 0x5f),
    }
}

fn light() -> Swatch {
    Swatch {
        background: color!(0xf7, 0xf6, 0xf4),
        text: color!(0x22, 0x22, 0x26),
        primary: color!(0x1f, 0x8a, 0x83),
        danger: color!(0xe5, 0x3e, 0x3e),
    }
}

fn dark_high_contrast() -> Swatch {
    Swatch {
        background: Color::BLACK,
        text: Color::WHITE,
        primary: color!(0x5c, 0xe1, 0xd6),
        danger: color!(0xff, 0x45, 0x3a),
    }
}

fn light_high_contrast() -> Swatch {
    Swatch {
        background: Color::WHITE,
        text: Color::BLACK,
        primary: color!(0x00, 0x5f, 0x59),
        danger: color!(0xc4, 0x00, 0x12),
    }
}

pub fn resolve_theme(appearance: Appearance, high_contrast: bool) -> Theme {
    let is_dark = match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => system_prefers_dark(),
    };
    let swatch = match (is_dark, high_contrast) {
        (true, false) => dark(),
        (false, false) => light(),
        (true, true) => dark_high_contrast(),
        (false, true) => light_high_contrast(),
    };

    Theme::custom(
        "AcneScan",
        Palette {
            background: swatch.background,
            text: swatch.text,
            primary: swatch.primary,
            success: color!(0x2f, 0xa8, 0x4f),
            warning: color!(0xe8, 0xa3, 0x00),
            danger: swatch.danger,
        },
    )
}

/// Secondary text color for status lines and captions.
pub fn muted_color(theme: &Theme) -> Color {
    theme.palette().text.scale_alpha(0.65)
}

#[cfg(target_os = "macos")]
fn system_prefers_dark() -> bool {
    std::process::Command::new("defaults")
        .args(["read", "-g", "AppleInterfaceStyle"])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().eq_ignore_ascii_case("dark"))
        .unwrap_or(true)
}

#[cfg(not(target_os = "macos"))]
fn system_prefers_dark() -> bool {
    true
}
