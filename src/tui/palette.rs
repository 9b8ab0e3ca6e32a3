//! Colors for the light and dark themes

use crate::database::Theme;
use crate::proxy::LatencyTier;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub accent: Color,
    pub highlight: Color,
    pub good: Color,
    pub mid: Color,
    pub bad: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                background: Color::White,
                foreground: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                highlight: Color::Gray,
                good: Color::Green,
                mid: Color::Rgb(176, 120, 0),
                bad: Color::Red,
            },
            Theme::Dark => Self {
                background: Color::Black,
                foreground: Color::White,
                muted: Color::Gray,
                accent: Color::Cyan,
                highlight: Color::DarkGray,
                good: Color::LightGreen,
                mid: Color::Yellow,
                bad: Color::LightRed,
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.foreground).bg(self.background)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.muted)
        }
    }

    pub fn tier(&self, tier: LatencyTier) -> Color {
        match tier {
            LatencyTier::Good => self.good,
            LatencyTier::Mid => self.mid,
            LatencyTier::Bad => self.bad,
        }
    }
}

/// Human label of a tier
pub fn tier_label(tier: LatencyTier) -> &'static str {
    match tier {
        LatencyTier::Good => "excellent",
        LatencyTier::Mid => "average",
        LatencyTier::Bad => "weak",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_themes_differ() {
        let light = Palette::for_theme(Theme::Light);
        let dark = Palette::for_theme(Theme::Dark);
        assert_ne!(light.background, dark.background);
        assert_eq!(light.tier(LatencyTier::Bad), Color::Red);
    }
}
