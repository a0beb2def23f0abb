use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const LIGHT_LANES: [&str; 8] = [
    "#1a73e8", "#34a853", "#fbbc05", "#e91e63", "#00acc1", "#8e24aa", "#f4511e", "#7cb342",
];

const DARK_LANES: [&str; 8] = [
    "#64b5f6", "#66bb6a", "#ffd54f", "#f48fb1", "#26c6da", "#ba68c8", "#ff8a65", "#9ccc65",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn lane_color(self, lane: usize) -> &'static str {
        let palette = match self {
            Theme::Light => &LIGHT_LANES,
            Theme::Dark => &DARK_LANES,
        };
        palette[lane % palette.len()]
    }

    pub fn title_color(self) -> &'static str {
        match self {
            Theme::Light => "#222222",
            Theme::Dark => "#ffffff",
        }
    }

    pub fn message_color(self) -> &'static str {
        match self {
            Theme::Light => "#444444",
            Theme::Dark => "#dddddd",
        }
    }

    pub fn node_outline(self) -> &'static str {
        "#ffffff"
    }

    pub fn badge_fill(self) -> &'static str {
        match self {
            Theme::Light => "#e6f4ea",
            Theme::Dark => "#244e2a",
        }
    }

    pub fn badge_stroke(self) -> &'static str {
        match self {
            Theme::Light => "#a0cfa8",
            Theme::Dark => "#356a3d",
        }
    }

    pub fn badge_text(self) -> &'static str {
        match self {
            Theme::Light => "#137333",
            Theme::Dark => "#a5d6a7",
        }
    }

    pub fn default_background(self) -> &'static str {
        match self {
            Theme::Light => "white",
            Theme::Dark => "#1e1f22",
        }
    }
}
