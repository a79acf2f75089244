use ratatui::style::Color;
use mrag_core::{Connectivity, NotificationKind};

/// Named color presets selectable with `--theme` or `t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    #[default]
    Neon,
    Classic,
    Light,
}

impl ThemeName {
    pub const ALL: [ThemeName; 3] = [ThemeName::Neon, ThemeName::Classic, ThemeName::Light];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Neon => "neon",
            ThemeName::Classic => "classic",
            ThemeName::Light => "light",
        }
    }

    /// Case-insensitive lookup, `None` for unknown names
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(name))
    }

    pub fn next(&self) -> Self {
        match self {
            ThemeName::Neon => ThemeName::Classic,
            ThemeName::Classic => ThemeName::Light,
            ThemeName::Light => ThemeName::Neon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: ThemeName,
    pub accent: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub border: Color,
    pub border_focused: Color,
    pub muted: Color,
    pub text: Color,
    pub user: Color,
    pub assistant: Color,
    pub success: Color,
    pub error: Color,
    pub info: Color,
    pub warning: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_name(ThemeName::default())
    }
}

impl Theme {
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Neon => Self {
                name,
                accent: Color::Magenta,
                header_bg: Color::Rgb(20, 10, 40),
                header_fg: Color::Cyan,
                border: Color::DarkGray,
                border_focused: Color::Magenta,
                muted: Color::DarkGray,
                text: Color::White,
                user: Color::Cyan,
                assistant: Color::LightMagenta,
                success: Color::LightGreen,
                error: Color::LightRed,
                info: Color::LightBlue,
                warning: Color::LightYellow,
            },
            ThemeName::Classic => Self {
                name,
                accent: Color::Cyan,
                header_bg: Color::DarkGray,
                header_fg: Color::Cyan,
                border: Color::DarkGray,
                border_focused: Color::Yellow,
                muted: Color::DarkGray,
                text: Color::Reset,
                user: Color::Cyan,
                assistant: Color::Yellow,
                success: Color::Green,
                error: Color::Red,
                info: Color::Blue,
                warning: Color::Yellow,
            },
            ThemeName::Light => Self {
                name,
                accent: Color::Blue,
                header_bg: Color::Gray,
                header_fg: Color::Black,
                border: Color::Gray,
                border_focused: Color::Blue,
                muted: Color::Gray,
                text: Color::Black,
                user: Color::Blue,
                assistant: Color::Magenta,
                success: Color::Green,
                error: Color::Red,
                info: Color::Blue,
                warning: Color::Rgb(180, 120, 0),
            },
        }
    }

    /// Resolve a configured name, falling back to the default preset
    pub fn named(name: Option<&str>) -> Self {
        name.and_then(ThemeName::parse)
            .map(Self::from_name)
            .unwrap_or_default()
    }

    pub fn notification_color(&self, kind: NotificationKind) -> Color {
        match kind {
            NotificationKind::Success => self.success,
            NotificationKind::Error => self.error,
            NotificationKind::Info => self.info,
            NotificationKind::Warning => self.warning,
        }
    }

    pub fn connectivity_color(&self, connectivity: Connectivity) -> Color {
        match connectivity {
            Connectivity::Checking => self.warning,
            Connectivity::Online => self.success,
            Connectivity::Offline => self.error,
        }
    }
}
