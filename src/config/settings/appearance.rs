// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use serde::Serialize;

use super::Settings;

/// Margin between the window and the screen edge, in pixels
const SCREEN_MARGIN: i32 = 20;

/// Core and glow colors for a theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeColors {
    pub core: &'static str,
    pub glow: &'static str,
}

/// Window size and top-left placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowGeometry {
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
}

impl Settings {
    /// Colors for the configured theme. Unknown themes fall back to cyan.
    pub fn theme_colors(&self) -> ThemeColors {
        let (core, glow) = match self.theme.as_str() {
            "purple" => ("#a855f7", "rgba(168, 85, 247, 0.5)"),
            "green" => ("#00ff88", "rgba(0, 255, 136, 0.5)"),
            "gold" => ("#ffd700", "rgba(255, 215, 0, 0.5)"),
            "red" => ("#ff0055", "rgba(255, 0, 85, 0.5)"),
            "blue" => ("#0088ff", "rgba(0, 136, 255, 0.5)"),
            _ => ("#00f2ff", "rgba(0, 242, 255, 0.5)"),
        };
        ThemeColors { core, glow }
    }

    /// Window dimensions for the configured size. Unknown sizes fall back to medium.
    pub fn window_size(&self) -> (i32, i32) {
        match self.size.as_str() {
            "small" => (250, 350),
            "large" => (450, 550),
            _ => (350, 450),
        }
    }

    /// Window placement on a screen of the given work-area size.
    /// Unknown positions fall back to bottom-right.
    pub fn window_geometry(&self, screen_width: i32, screen_height: i32) -> WindowGeometry {
        let (width, height) = self.window_size();
        let right = screen_width - width - SCREEN_MARGIN;
        let bottom = screen_height - height - SCREEN_MARGIN;

        let (x, y) = match self.position.as_str() {
            "top-left" => (SCREEN_MARGIN, SCREEN_MARGIN),
            "top-right" => (right, SCREEN_MARGIN),
            "bottom-left" => (SCREEN_MARGIN, bottom),
            "center" => ((screen_width - width) / 2, (screen_height - height) / 2),
            _ => (right, bottom),
        };

        WindowGeometry {
            width,
            height,
            x,
            y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_colors() {
        let mut settings = Settings::default();
        assert_eq!(settings.theme_colors().core, "#00f2ff");

        settings.theme = "gold".to_string();
        assert_eq!(
            settings.theme_colors(),
            ThemeColors {
                core: "#ffd700",
                glow: "rgba(255, 215, 0, 0.5)"
            }
        );

        settings.theme = "unknown".to_string();
        assert_eq!(settings.theme_colors().core, "#00f2ff");
    }

    #[test]
    fn test_window_size_presets() {
        let mut settings = Settings::default();
        assert_eq!(settings.window_size(), (350, 450));
        settings.size = "small".to_string();
        assert_eq!(settings.window_size(), (250, 350));
        settings.size = "large".to_string();
        assert_eq!(settings.window_size(), (450, 550));
    }

    #[test]
    fn test_window_geometry_bottom_right() {
        let settings = Settings::default();
        let geometry = settings.window_geometry(1920, 1080);
        assert_eq!(geometry.x, 1920 - 350 - 20);
        assert_eq!(geometry.y, 1080 - 450 - 20);
    }

    #[test]
    fn test_window_geometry_corners_and_center() {
        let mut settings = Settings::default();
        settings.position = "top-left".to_string();
        let g = settings.window_geometry(1920, 1080);
        assert_eq!((g.x, g.y), (20, 20));

        settings.position = "center".to_string();
        let g = settings.window_geometry(1920, 1080);
        assert_eq!((g.x, g.y), ((1920 - 350) / 2, (1080 - 450) / 2));

        settings.position = "nowhere".to_string();
        let g = settings.window_geometry(1920, 1080);
        assert_eq!((g.x, g.y), (1550, 610));
    }
}
