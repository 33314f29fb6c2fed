/*!
format.rs

Human-readable output helpers for the CLI (JSON paths never use these).

  - StyleOptions::detect()   NO_COLOR / NO_EMOJI / COLUMNS aware
  - color(role, text, &style)
  - emoji(tag, &style)
  - box_header(title, subtitle, &style)
  - table(headers, rows, &style)
  - truncate_ellipsis(s, max_chars)
*/

use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
}

impl StyleOptions {
    pub fn detect() -> Self {
        let term_width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        Self {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
            term_width,
        }
    }

    pub fn plain(term_width: usize) -> Self {
        Self {
            use_color: false,
            use_emoji: false,
            term_width,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Warning => "38;5;214",
        Role::Error => "38;5;196",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "warn" => "⚠",
        "info" => "ℹ",
        "list" => "📜",
        "device" => "📱",
        _ => "",
    }
}

/// Single-line boxed title; long content is truncated rather than wrapped.
pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title = title.as_ref();
    let sub = subtitle.as_ref().map(|s| s.as_ref().replace(" ms", "ms"));

    let plain_len = title.chars().count() + sub.as_ref().map_or(0, |s| s.chars().count() + 2);
    let inner = plain_len.min(style.term_width.saturating_sub(4).max(10));

    let mut body = color(Role::Primary, title, style);
    if let Some(s) = &sub {
        body.push_str("  ");
        body.push_str(&color(Role::Secondary, s, style));
    }
    let body = if plain_len > inner {
        truncate_ellipsis(&strip_ansi(&body), inner)
    } else {
        body
    };
    let pad = inner.saturating_sub(display_width(&body));

    let rule = "─".repeat(inner + 2);
    format!(
        "┌{rule}┐\n│ {body}{} │\n└{rule}┘",
        " ".repeat(pad)
    )
}

/// Left-aligned columns separated by two spaces; the widest columns shrink
/// first when the total exceeds the terminal width.
pub fn table(headers: &[&str], rows: &[Vec<String>], style: &StyleOptions) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let total: usize = widths.iter().sum::<usize>() + (cols - 1) * 2;
    if total > style.term_width {
        let mut overflow = total - style.term_width;
        let mut order: Vec<usize> = (0..cols).collect();
        order.sort_by(|a, b| widths[*b].cmp(&widths[*a]));
        for idx in order {
            if overflow == 0 {
                break;
            }
            let shrink = widths[idx].saturating_sub(4).min(overflow);
            widths[idx] -= shrink;
            overflow -= shrink;
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(color(
        Role::Accent,
        render_row(headers.iter().copied(), &widths),
        style,
    ));
    lines.push(color(
        Role::Dim,
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "),
        style,
    ));
    for row in rows {
        let cells = (0..cols).map(|i| row.get(i).map(String::as_str).unwrap_or(""));
        lines.push(render_row(cells, &widths));
    }
    lines.join("\n")
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(c, w)| fit(c, *w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn fit(s: &str, width: usize) -> String {
    let len = display_width(s);
    if len <= width {
        format!("{s}{}", " ".repeat(width - len))
    } else {
        truncate_ellipsis(&strip_ansi(s), width)
    }
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for n in chars.by_ref() {
                if n.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_header_contains_title() {
        let b = box_header("Title", Some("sub info"), &StyleOptions::plain(80));
        assert!(b.contains("Title  sub info"));
        assert_eq!(b.lines().count(), 3);
    }

    #[test]
    fn table_aligns_columns() {
        let t = table(
            &["A", "B"],
            &[
                vec!["x".into(), "y".into()],
                vec!["longer".into(), "val".into()],
            ],
            &StyleOptions::plain(80),
        );
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines[0], "A       B");
        assert_eq!(lines[2], "x       y");
        assert_eq!(lines[3], "longer  val");
    }

    #[test]
    fn table_shrinks_to_width() {
        let long = "d".repeat(200);
        let t = table(&["NAME", "DESC"], &[vec!["tap".into(), long]], &StyleOptions::plain(40));
        assert!(t.lines().all(|l| l.chars().count() <= 40));
        assert!(t.contains('…'));
    }

    #[test]
    fn truncate() {
        assert_eq!(truncate_ellipsis("abcdef", 4), "abc…");
        assert_eq!(truncate_ellipsis("abc", 4), "abc");
    }

    #[test]
    fn strips_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRED\x1b[0m"), "RED");
    }
}
