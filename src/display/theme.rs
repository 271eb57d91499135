//! Terminal styling for status lines and risk scores.

use console::Style;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::sync::LazyLock;

pub static THEME: LazyLock<Theme> = LazyLock::new(Theme::default);

/// Kind of a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Done,
    Failed,
    Caution,
}

impl Tone {
    fn icon(self) -> &'static str {
        match self {
            Tone::Done => "✓",
            Tone::Failed => "✗",
            Tone::Caution => "⚠",
        }
    }

    /// Failures go to stderr, everything else to stdout.
    fn on_stderr(self) -> bool {
        matches!(self, Tone::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub done: Style,
    pub failed: Style,
    pub caution: Style,
    pub heading: Style,
    pub muted: Style,
    /// Risk at or above 7
    pub risk_high: Style,
    /// Risk in [4, 7)
    pub risk_medium: Style,
    pub risk_low: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            done: Style::new().green(),
            failed: Style::new().red().bold(),
            caution: Style::new().yellow(),
            heading: Style::new().cyan().bold().underlined(),
            muted: Style::new().dim(),
            risk_high: Style::new().red().bold(),
            risk_medium: Style::new().yellow(),
            risk_low: Style::new().green(),
        }
    }
}

impl Theme {
    /// Icon-prefixed message, plain when the target stream is not a colour terminal.
    pub fn status(&self, tone: Tone, text: &str) -> String {
        if !Self::colors_enabled(tone.on_stderr()) {
            return format!("{} {text}", tone.icon());
        }
        let (icon, style) = match tone {
            Tone::Done => (tone.icon().green().to_string(), &self.done),
            Tone::Failed => (tone.icon().red().bold().to_string(), &self.failed),
            Tone::Caution => (tone.icon().yellow().to_string(), &self.caution),
        };
        format!("{icon} {}", style.apply_to(text))
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint(&self.heading, text)
    }

    pub fn muted(&self, text: &str) -> String {
        self.paint(&self.muted, text)
    }

    /// A 0-10 risk score with one decimal, coloured by band.
    pub fn risk(&self, score: f32) -> String {
        let style = if score >= 7.0 {
            &self.risk_high
        } else if score >= 4.0 {
            &self.risk_medium
        } else {
            &self.risk_low
        };
        self.paint(style, format!("{score:.1}"))
    }

    fn paint<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if Self::colors_enabled(false) {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// `NO_COLOR` wins over terminal detection.
    pub fn colors_enabled(stderr: bool) -> bool {
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if stderr {
            std::io::stderr().is_terminal()
        } else {
            std::io::stdout().is_terminal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_carries_icon_and_text() {
        let theme = Theme::default();
        for (tone, icon) in [(Tone::Done, "✓"), (Tone::Failed, "✗"), (Tone::Caution, "⚠")] {
            let line = theme.status(tone, "indexed");
            assert!(line.contains(icon));
            assert!(line.contains("indexed"));
        }
    }

    #[test]
    fn test_risk_formats_one_decimal() {
        let theme = Theme::default();
        assert!(theme.risk(7.26).contains("7.3"));
        assert!(theme.risk(0.0).contains("0.0"));
    }
}
