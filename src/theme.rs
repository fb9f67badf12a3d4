//! Markers, colors and thresholds used while annotating records.
//!
//! Built once per run from the output flags and passed to whoever needs it.

#[derive(Debug, Clone)]
pub struct Emojis {
    pub not_yet_started: String,
    pub in_flight: String,
    pub observing: String,
    pub resolved: String,
    pub master_blocking: String,
    pub master_informing: String,
    pub status_failing: String,
    pub status_flaky: String,
    pub status_new: String,
    pub status_old: String,
}

impl Emojis {
    pub fn standard() -> Self {
        Self {
            not_yet_started: "\u{1F914}".into(),
            in_flight: "\u{1F6EB}".into(),
            observing: "\u{1F440}".into(),
            resolved: "\u{1F389}".into(),
            master_blocking: "\u{1F525}".into(),
            master_informing: "\u{1F4A1}".into(),
            status_failing: "\u{1F534}".into(),
            status_flaky: "\u{1F535}".into(),
            status_new: "\u{2728}".into(),
            status_old: "\u{1F319}".into(),
        }
    }

    pub fn none() -> Self {
        Self {
            not_yet_started: String::new(),
            in_flight: String::new(),
            observing: String::new(),
            resolved: String::new(),
            master_blocking: String::new(),
            master_informing: String::new(),
            status_failing: String::new(),
            status_flaky: String::new(),
            status_new: String::new(),
            status_old: String::new(),
        }
    }
}

/// ANSI escape sequences. Empty when color is off.
#[derive(Debug, Clone)]
pub struct Palette {
    pub reset: &'static str,
    pub red: &'static str,
    pub blue: &'static str,
}

impl Palette {
    pub fn ansi() -> Self {
        Self {
            reset: "\x1b[0m",
            red: "\x1b[31m",
            blue: "\x1b[34m",
        }
    }

    pub fn plain() -> Self {
        Self {
            reset: "",
            red: "",
            blue: "",
        }
    }

    /// Wraps `text` in `color`, leaving it untouched when the palette is plain.
    pub fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{color}{text}{}", self.reset)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Success ratios at or below this are high severity.
    pub high: f64,
    /// Success ratios at or below this (and above `high`) are medium severity.
    pub medium: f64,
    /// Jobs with this many recent runs or fewer are too new to judge.
    pub new_job_runs: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high: 0.5,
            medium: 0.8,
            new_job_runs: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub emojis: Emojis,
    pub palette: Palette,
    pub thresholds: Thresholds,
}

impl Theme {
    pub fn new(emoji: bool, color: bool) -> Self {
        Self {
            emojis: if emoji { Emojis::standard() } else { Emojis::none() },
            palette: if color { Palette::ansi() } else { Palette::plain() },
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(true, true)
    }
}
