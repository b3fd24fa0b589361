use crate::model::MarkdownFile;
use crate::shared::table::{display_len, pad_field, truncate_with_ellipsis};
use chrono::{DateTime, Local};
use yansi::Paint;

/// Color palette for consistent theming
pub struct ColorPalette {
    pub muted: (u8, u8, u8),     // Info lines, folder counts
    pub folder: (u8, u8, u8),    // Folder headers
    pub timestamp: (u8, u8, u8), // Timestamps
    pub highlight: (u8, u8, u8), // Search matches
}

impl ColorPalette {
    pub const CATPPUCCIN: Self = Self {
        muted: (108, 112, 134),     // Gray
        folder: (148, 226, 213),    // Teal
        timestamp: (137, 180, 250), // Blue
        highlight: (243, 139, 168), // Pink
    };
}

/// Formatting context passed through rendering pipeline
pub struct FormatContext {
    pub use_color: bool,
    pub palette: ColorPalette,
    /// Visible columns available for a file row
    pub width: usize,
}

impl FormatContext {
    pub const DEFAULT_WIDTH: usize = 100;

    pub fn new(use_color: bool) -> Self {
        Self { use_color, palette: ColorPalette::CATPPUCCIN, width: Self::DEFAULT_WIDTH }
    }

    pub fn from_env() -> Self {
        let use_color = std::env::var("NO_COLOR").is_err();
        let width = terminal_size::terminal_size()
            .map(|(terminal_size::Width(w), _)| usize::from(w))
            .unwrap_or(Self::DEFAULT_WIDTH);
        Self { width, ..Self::new(use_color) }
    }

    fn paint(&self, text: &str, (r, g, b): (u8, u8, u8)) -> String {
        if self.use_color {
            Paint::rgb(text, r, g, b).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn format_muted(&self, text: &str) -> String {
        self.paint(text, self.palette.muted)
    }

    pub fn format_folder(&self, folder: &str, count: usize) -> String {
        let label = if folder.is_empty() { "." } else { folder };
        if self.use_color {
            let (r, g, b) = self.palette.folder;
            format!(
                "{} {}",
                Paint::rgb(label, r, g, b).bold(),
                self.format_muted(&format!("({count})"))
            )
        } else {
            format!("{label} ({count})")
        }
    }

    pub fn format_timestamp(&self, ts: &str) -> String {
        self.paint(ts, self.palette.timestamp)
    }

    pub fn format_tag(&self, tag: &str) -> String {
        let text = format!("#{tag}");
        if self.use_color {
            let (r, g, b) = crate::tags::color_for_tag(tag);
            Paint::rgb(&text, r, g, b).bold().to_string()
        } else {
            text
        }
    }

    pub fn format_tags(&self, tags: &[String]) -> String {
        tags.iter()
            .map(|t| self.format_tag(t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn highlight_match(&self, text: &str, query: Option<&str>) -> String {
        let Some(q) = query else { return text.to_string() };
        if q.is_empty() || !self.use_color {
            return text.to_string();
        }

        let (r, g, b) = self.palette.highlight;
        let mut out = String::new();
        let mut plain_start = 0;
        let mut i = 0;
        while i < text.len() {
            match match_len(&text[i..], q) {
                Some(len) => {
                    out.push_str(&text[plain_start..i]);
                    out.push_str(&Paint::rgb(&text[i..i + len], r, g, b).to_string());
                    i += len;
                    plain_start = i;
                }
                None => i += text[i..].chars().next().map_or(1, char::len_utf8),
            }
        }
        out.push_str(&text[plain_start..]);
        out
    }

    /// One list row: name, relative time and display tags, cut to `width`.
    pub fn format_file_row(
        &self,
        file: &MarkdownFile,
        time: &TimeFormatter,
        tags: &[String],
        query: Option<&str>,
    ) -> String {
        let when = time.relative(file.last_modified);
        let tag_text = tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" ");
        let reserved = when.chars().count() + tag_text.chars().count() + 6;
        let name_width = self.width.saturating_sub(reserved).max(12);
        let name = truncate_with_ellipsis(&file.name, name_width);
        let name_len = display_len(&name);

        let mut row = format!(
            "  {}  {}",
            pad_field(&self.highlight_match(&name, query), name_width.min(40), name_len),
            self.format_timestamp(&when)
        );
        if !tags.is_empty() {
            row.push_str("  ");
            row.push_str(&self.format_tags(tags));
        }
        row
    }
}

/// Byte length of the case-insensitive match of `query` at the start of
/// `text`, measured on `text`'s own char boundaries.
fn match_len(text: &str, query: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    for qc in query.chars() {
        let (_, tc) = chars.next()?;
        if !tc.to_lowercase().eq(qc.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or(text.len(), |(i, _)| i))
}

/// Relative modification times against a fixed "now".
pub struct TimeFormatter {
    now: DateTime<Local>,
}

impl TimeFormatter {
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now }
    }

    pub fn relative(&self, dt: DateTime<Local>) -> String {
        let days = (self.now.date_naive() - dt.date_naive()).num_days();
        match days {
            0 => format!("today, {}", dt.format("%H:%M")),
            1 => format!("yesterday, {}", dt.format("%H:%M")),
            2..=6 => format!("{days} days ago"),
            // future or older than a week
            _ => dt.format("%Y-%m-%d").to_string(),
        }
    }
}
