//! Reusable TUI widgets.

use botdemo_shared::{FileStatus, UploadedFile, format_bytes};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Bottom status bar.
pub(crate) fn status_bar(msg: &str) -> Paragraph<'_> {
    Paragraph::new(format!(" {msg}")).style(Style::default().bg(Color::DarkGray).fg(Color::White))
}

/// Border/label style for a focusable field.
pub(crate) fn field_style(focused: bool, editing: bool) -> Style {
    match (focused, editing) {
        (true, true) => Style::default().fg(Color::Yellow),
        (true, false) => Style::default().fg(Color::Cyan),
        _ => Style::default(),
    }
}

/// One document row: status, name, size.
pub(crate) fn file_line(file: &UploadedFile) -> Line<'static> {
    let color = match file.status {
        FileStatus::Uploading | FileStatus::Processing => Color::Yellow,
        FileStatus::Ready => Color::Green,
        FileStatus::Error => Color::Red,
    };
    let detail = match &file.error_message {
        Some(message) => message.clone(),
        None => format_bytes(file.size),
    };
    Line::from(vec![
        Span::styled(format!("{:<14}", file.status.label()), Style::default().fg(color)),
        Span::raw(file.name.clone()),
        Span::styled(format!("  {detail}"), Style::default().fg(Color::DarkGray)),
    ])
}
