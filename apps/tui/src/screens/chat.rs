//! Chat screen: conversation, message input, documents and context panels.

use std::path::PathBuf;

use botdemo_core::SessionSnapshot;
use botdemo_shared::{BotDemoConfig, ChatMessage, Role};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use super::Action;
use crate::widgets::{field_style, file_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Input,
    Files,
}

pub(crate) struct ChatScreen {
    input: String,
    focus: Focus,
    file_cursor: usize,
}

impl ChatScreen {
    pub(crate) fn new() -> Self {
        Self {
            input: String::new(),
            focus: Focus::Input,
            file_cursor: 0,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.focus == Focus::Input
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, bot: &BotDemoConfig, snap: &SessionSnapshot) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(40)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(columns[1]);

        self.draw_messages(f, left[0], bot, snap);
        self.draw_input(f, left[1], snap);
        self.draw_files(f, right[0], snap);
        draw_context(f, right[1], snap);
    }

    fn draw_messages(&self, f: &mut Frame, area: Rect, bot: &BotDemoConfig, snap: &SessionSnapshot) {
        let mut lines: Vec<Line> = Vec::new();

        if bot.output_config.show_disclaimer {
            if let Some(text) = &bot.output_config.disclaimer_text {
                lines.push(Line::styled(
                    format!("Note: {text}"),
                    Style::default().fg(Color::Yellow),
                ));
                lines.push(Line::from(""));
            }
        }

        for message in &snap.messages {
            push_message(&mut lines, message, bot);
        }

        // Only the welcome message so far: offer the starters.
        if snap.messages.len() == 1 && !bot.starter_questions.is_empty() {
            lines.push(Line::styled(
                "Try asking (Esc, then 1-9):",
                Style::default().fg(Color::DarkGray),
            ));
            for (i, starter) in bot.starter_questions.iter().enumerate() {
                lines.push(Line::styled(
                    format!("  {}. {starter}", i + 1),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }

        let inner_width = area.width.saturating_sub(2).max(1) as usize;
        let inner_height = area.height.saturating_sub(2) as usize;
        let rows: usize = lines
            .iter()
            .map(|l| l.width().div_ceil(inner_width).max(1))
            .sum();
        let scroll = rows.saturating_sub(inner_height) as u16;

        let title = format!(" {} {} ", bot.icon, bot.display_name());
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(paragraph, area);
    }

    fn draw_input(&self, f: &mut Frame, area: Rect, snap: &SessionSnapshot) {
        let focused = self.focus == Focus::Input;
        let text = if snap.is_loading && self.input.is_empty() {
            Span::styled("Waiting for the answer...", Style::default().fg(Color::DarkGray))
        } else if focused {
            Span::raw(format!("{}▏", self.input))
        } else {
            Span::raw(self.input.clone())
        };
        let title = if focused {
            " Message  (Enter: send · /upload <path> · Esc: documents) "
        } else {
            " Message  (i: type) "
        };
        let input = Paragraph::new(Line::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(field_style(focused, focused)),
        );
        f.render_widget(input, area);
    }

    fn draw_files(&self, f: &mut Frame, area: Rect, snap: &SessionSnapshot) {
        let focused = self.focus == Focus::Files;
        let items: Vec<ListItem> = if snap.files.is_empty() {
            vec![ListItem::new(Line::styled(
                "No documents. /upload <path>",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            snap.files
                .iter()
                .enumerate()
                .map(|(i, file)| {
                    let item = ListItem::new(file_line(file));
                    if focused && i == self.file_cursor {
                        item.style(Style::default().add_modifier(Modifier::REVERSED))
                    } else {
                        item
                    }
                })
                .collect()
        };
        let title = if snap.is_uploading {
            " Documents (uploading...) "
        } else if focused {
            " Documents  (d: remove · r: reset) "
        } else {
            " Documents "
        };
        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(field_style(focused, false)),
        );
        f.render_widget(list, area);
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        bot: &BotDemoConfig,
        snap: &SessionSnapshot,
    ) -> Action {
        match self.focus {
            Focus::Input => match code {
                KeyCode::Esc => {
                    self.focus = Focus::Files;
                    Action::None
                }
                KeyCode::Enter => {
                    let line = std::mem::take(&mut self.input);
                    parse_input(&line)
                }
                KeyCode::Backspace => {
                    self.input.pop();
                    Action::None
                }
                KeyCode::Char(c) => {
                    self.input.push(c);
                    Action::None
                }
                _ => Action::None,
            },
            Focus::Files => match code {
                KeyCode::Char('i') | KeyCode::Enter | KeyCode::Esc => {
                    self.focus = Focus::Input;
                    Action::None
                }
                KeyCode::Up => {
                    self.file_cursor = self.file_cursor.saturating_sub(1);
                    Action::None
                }
                KeyCode::Down => {
                    if self.file_cursor + 1 < snap.files.len() {
                        self.file_cursor += 1;
                    }
                    Action::None
                }
                KeyCode::Char('d') | KeyCode::Delete => match snap.files.get(self.file_cursor) {
                    Some(file) => {
                        self.file_cursor = self.file_cursor.saturating_sub(1);
                        Action::RemoveFile(file.id)
                    }
                    None => Action::None,
                },
                KeyCode::Char('r') => Action::Reset,
                KeyCode::Char(c @ '1'..='9') => {
                    let idx = (c as usize) - ('1' as usize);
                    match bot.starter_questions.get(idx) {
                        Some(starter) => {
                            self.focus = Focus::Input;
                            Action::Send(starter.clone())
                        }
                        None => Action::None,
                    }
                }
                _ => Action::None,
            },
        }
    }
}

/// Interpret a submitted input line.
fn parse_input(line: &str) -> Action {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some(("/upload", paths)) => {
            Action::Upload(paths.split_whitespace().map(PathBuf::from).collect())
        }
        _ if line == "/upload" => Action::Status("Usage: /upload <path>...".to_string()),
        _ if line == "/reset" => Action::Reset,
        _ if line.is_empty() => Action::None,
        _ => Action::Send(line.to_string()),
    }
}

fn push_message<'a>(lines: &mut Vec<Line<'a>>, message: &'a ChatMessage, bot: &BotDemoConfig) {
    let (who, color) = match message.role {
        Role::User => ("You".to_string(), Color::Cyan),
        Role::Assistant => (bot.display_name(), Color::Green),
    };
    lines.push(Line::styled(
        who,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ));

    if message.is_streaming && message.content.is_empty() {
        lines.push(Line::styled(
            "Thinking...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    } else {
        lines.extend(message.content.lines().map(Line::raw));
    }

    if bot.output_config.show_sources && !message.sources.is_empty() {
        let titles: Vec<&str> = message.sources.iter().map(|s| s.title.as_str()).collect();
        lines.push(Line::styled(
            format!("Sources: {}", titles.join(", ")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::from(""));
}

fn draw_context(f: &mut Frame, area: Rect, snap: &SessionSnapshot) {
    let body = if snap.context_summary.is_empty() {
        Text::styled("Nothing shared yet.", Style::default().fg(Color::DarkGray))
    } else {
        Text::raw(snap.context_summary.as_str())
    };
    let paragraph = Paragraph::new(body).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" What the bot knows ({}) ", snap.context_counts)),
    );
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_lines_map_to_actions() {
        assert_eq!(parse_input("  hello there "), Action::Send("hello there".into()));
        assert_eq!(
            parse_input("/upload a.pdf b.docx"),
            Action::Upload(vec![PathBuf::from("a.pdf"), PathBuf::from("b.docx")])
        );
        assert!(matches!(parse_input("/upload"), Action::Status(_)));
        assert_eq!(parse_input("/reset"), Action::Reset);
        assert_eq!(parse_input("   "), Action::None);
    }
}
