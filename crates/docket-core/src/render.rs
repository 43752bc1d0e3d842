use std::io::{self, IsTerminal, Write};

use chrono::{Local, Timelike};
use unicode_width::UnicodeWidthStr;

use crate::category::{Category, DEFAULT_COLOR};
use crate::config::Config;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, categories))]
    pub fn print_task_list(
        &mut self,
        selected: &str,
        tasks: &[&Task],
        categories: &[Category],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{}", greeting(Local::now().hour()))?;
        let header = match categories.iter().find(|c| c.name == selected) {
            Some(category) => format!("{} {}", category.icon, category.name),
            None => selected.to_string(),
        };
        writeln!(out, "{header}")?;
        writeln!(out)?;

        if tasks.is_empty() {
            writeln!(out, "No tasks to display")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.short_id(), "33");
            let done = if task.completed {
                self.paint("[x]", "32")
            } else {
                "[ ]".to_string()
            };
            let category = self.paint_category(&task.category, categories);
            rows.push(vec![id, done, category, task.title.clone()]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, categories))]
    pub fn print_categories(&mut self, categories: &[Category]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec!["Icon".to_string(), "Name".to_string(), "Count".to_string()];
        let rows = categories
            .iter()
            .map(|category| {
                vec![
                    category.icon.clone(),
                    self.paint_category(&category.name, categories),
                    category.count.to_string(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, categories))]
    pub fn print_task_info(&mut self, task: &Task, categories: &[Category]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let icon = categories
            .iter()
            .find(|c| c.name == task.category)
            .map(|c| format!("{} ", c.icon))
            .unwrap_or_default();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "category  {icon}{}", task.category)?;
        writeln!(
            out,
            "completed {}",
            if task.completed { "yes" } else { "no" }
        )?;

        Ok(())
    }

    fn paint_category(&self, name: &str, categories: &[Category]) -> String {
        let code = categories
            .iter()
            .find(|c| c.name == name && !c.is_virtual())
            .and_then(|c| ansi_for_hex(&c.color));
        match code {
            Some(code) => self.paint(name, &code),
            None => name.to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Greeting for the local hour: morning from 5, afternoon from 12, evening from 18.
pub fn greeting(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning! 🌞",
        12..=17 => "Good afternoon! 🌤️",
        _ => "Good evening! 🌙",
    }
}

/// 24-bit foreground code for `#rrggbb`; `None` for the neutral default color
/// or anything unparseable.
fn ansi_for_hex(color: &str) -> Option<String> {
    if color.eq_ignore_ascii_case(DEFAULT_COLOR) {
        return None;
    }
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(format!("38;2;{r};{g};{b}"))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{Renderer, ansi_for_hex, greeting, strip_ansi, write_table};
    use crate::config::Config;

    #[test]
    fn greeting_follows_time_of_day() {
        assert_eq!(greeting(4), "Good evening! 🌙");
        assert_eq!(greeting(5), "Good morning! 🌞");
        assert_eq!(greeting(12), "Good afternoon! 🌤️");
        assert_eq!(greeting(18), "Good evening! 🌙");
    }

    #[test]
    fn hex_colors_map_to_truecolor_codes() {
        assert_eq!(ansi_for_hex("#5ac8fa").as_deref(), Some("38;2;90;200;250"));
        assert_eq!(ansi_for_hex("#FFFFFF"), None);
        assert_eq!(ansi_for_hex("teal"), None);
        assert_eq!(ansi_for_hex("#12345"), None);
    }

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["A".to_string(), "B".to_string()],
            vec![
                vec!["\x1b[33mxy\x1b[0m".to_string(), "1".to_string()],
                vec!["xyz".to_string(), "2".to_string()],
            ],
        )
        .expect("write table");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<String> = text.lines().map(strip_ansi).collect();
        assert_eq!(lines[0], "A   B ");
        assert_eq!(lines[1], "--- - ");
        assert_eq!(lines[2], "xy  1 ");
        assert_eq!(lines[3], "xyz 2 ");
        assert_eq!(strip_ansi("\x1b[32m[x]\x1b[0m"), "[x]");
    }

    #[test]
    fn color_setting_uses_config_booleans() {
        let mut cfg = Config::defaults();
        assert!(Renderer::new(&cfg).expect("default").color);

        cfg.apply_overrides(vec![("rc.color".to_string(), "n".to_string())]);
        assert!(!Renderer::new(&cfg).expect("short no").color);

        cfg.apply_overrides(vec![("color".to_string(), "purple".to_string())]);
        let err = Renderer::new(&cfg).expect_err("not a boolean");
        assert!(err.to_string().contains("invalid boolean for color"));
    }
}
