//! Terminal rendering for tasks and reports. Nothing here touches storage.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use crossterm::style::Stylize;

use standup_core::standup::start_of_day;
use standup_core::Task;

/// Go-style RFC 822 layout, e.g. `13 Sep 24 14:00 UTC`.
pub const TIMESTAMP_FORMAT: &str = "%d %b %y %H:%M %Z";
const REPORT_DATE_FORMAT: &str = "%A, %b %d";
const HEADERS: [&str; 5] = ["#", "Task", "Done", "Created", "Completed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStyle {
    Done,
    Pending,
}

pub fn style_for(task: &Task) -> TaskStyle {
    if task.done {
        TaskStyle::Done
    } else {
        TaskStyle::Pending
    }
}

fn paint(text: &str, style: TaskStyle, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match style {
        TaskStyle::Done => text.green().to_string(),
        TaskStyle::Pending => text.blue().to_string(),
    }
}

/// Tasks shown by a plain `ls`: everything pending plus whatever was
/// completed since the start of `now`'s day.
pub fn listing_filter<'a, Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Vec<&'a Task> {
    let today = start_of_day(now).with_timezone(&Utc);
    tasks
        .iter()
        .filter(|task| task.is_pending() || task.completed_after(today))
        .collect()
}

fn format_timestamp<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    at.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string()
}

fn width(text: &str) -> usize {
    text.chars().count()
}

fn pad(text: &str, to: usize) -> String {
    let fill = to.saturating_sub(width(text));
    format!("{text}{}", " ".repeat(fill))
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}

/// Render `tasks` as a box table with a pending-count footer. Timestamps are
/// shown in `tz`; `color = false` produces plain text.
pub fn render_table<Tz: TimeZone>(tasks: &[&Task], pending: usize, tz: &Tz, color: bool) -> String
where
    Tz::Offset: Display,
{
    let rows: Vec<(TaskStyle, [String; 5])> = tasks
        .iter()
        .map(|task| {
            let style = style_for(task);
            let name = match style {
                TaskStyle::Done => format!("* {}", task.task),
                TaskStyle::Pending => task.task.clone(),
            };
            let done = if task.done { "Yes" } else { "No" };
            let completed = task
                .completed_at
                .as_ref()
                .map(|at| format_timestamp(at, tz))
                .unwrap_or_default();
            (
                style,
                [
                    task.id.to_string(),
                    name,
                    done.to_string(),
                    format_timestamp(&task.created_at, tz),
                    completed,
                ],
            )
        })
        .collect();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| width(h)).collect();
    for (_, cells) in &rows {
        for (idx, cell) in cells.iter().enumerate() {
            widths[idx] = widths[idx].max(width(cell));
        }
    }

    let footer = format!("you have {pending} pending todos");
    let inner = |widths: &[usize]| widths.iter().map(|w| w + 2).sum::<usize>() + widths.len() - 1;
    let short = width(&footer).saturating_sub(inner(&widths));
    if let Some(last) = widths.last_mut() {
        *last += short;
    }
    let inner_width = inner(&widths);

    let mut out = Vec::new();
    out.push(border(&widths, '┌', '┬', '┐'));
    let header: Vec<String> = HEADERS
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!(" {} ", pad(h, *w)))
        .collect();
    out.push(format!("│{}│", header.join("│")));
    out.push(border(&widths, '├', '┼', '┤'));
    for (style, cells) in &rows {
        let rendered: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(idx, (cell, w))| {
                let padded = pad(cell, *w);
                // Only the task name and done flag are coloured.
                if idx == 1 || idx == 2 {
                    format!(" {} ", paint(&padded, *style, color))
                } else {
                    format!(" {padded} ")
                }
            })
            .collect();
        out.push(format!("│{}│", rendered.join("│")));
    }
    out.push(border(&widths, '├', '┴', '┤'));

    let left = (inner_width - width(&footer)) / 2;
    let right = inner_width - width(&footer) - left;
    let footer_text = if color {
        footer.as_str().red().to_string()
    } else {
        footer.clone()
    };
    out.push(format!(
        "│{}{}{}│",
        " ".repeat(left),
        footer_text,
        " ".repeat(right)
    ));
    out.push(border(&widths, '└', '─', '┘'));

    let mut rendered = out.join("\n");
    rendered.push('\n');
    rendered
}

fn bullet_list(heading: String, lines: &[String], empty: &str) -> String {
    let mut out = heading;
    out.push('\n');
    if lines.is_empty() {
        out.push_str(&format!("  ({empty})\n"));
    }
    for line in lines {
        out.push_str(&format!("  - {line}\n"));
    }
    out
}

pub fn render_standup<Tz: TimeZone>(lines: &[String], lookback: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    bullet_list(
        format!("Since {}:", lookback.format(REPORT_DATE_FORMAT)),
        lines,
        "nothing completed",
    )
}

pub fn render_today<Tz: TimeZone>(lines: &[String], now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    bullet_list(
        format!("Today ({}):", now.format(REPORT_DATE_FORMAT)),
        lines,
        "nothing pending",
    )
}
