//! Intake screen: the bot's questions as a form, plus the gated start.

use botdemo_core::SessionSnapshot;
use botdemo_shared::{
    BotDemoConfig, IntakeAnswer, IntakePhase, IntakeQuestion, IntakeResponses, QuestionKind,
};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use super::Action;
use crate::widgets::{field_style, file_line};

pub(crate) struct IntakeScreen {
    /// Index into the visible questions.
    selected: usize,
    show_advanced: bool,
    editing: bool,
    buffer: String,
    /// Highlighted option of a multi-select.
    option_cursor: usize,
}

impl IntakeScreen {
    pub(crate) fn new() -> Self {
        Self {
            selected: 0,
            show_advanced: false,
            editing: false,
            buffer: String::new(),
            option_cursor: 0,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    fn visible<'a>(&self, bot: &'a BotDemoConfig) -> Vec<&'a IntakeQuestion> {
        bot.intake_questions
            .iter()
            .filter(|q| self.show_advanced || q.phase == IntakePhase::Essential)
            .collect()
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, bot: &BotDemoConfig, snap: &SessionSnapshot) {
        let has_advanced = bot
            .intake_questions
            .iter()
            .any(|q| q.phase == IntakePhase::Advanced);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Welcome
                Constraint::Min(1),    // Questions
                Constraint::Length(if snap.files.is_empty() { 0 } else { 2 + snap.files.len() as u16 }),
                Constraint::Length(3), // Start / hint
            ])
            .split(area);

        let welcome = Paragraph::new(bot.welcome_message.as_str())
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Gray));
        f.render_widget(welcome, chunks[0]);

        let items: Vec<ListItem> = self
            .visible(bot)
            .into_iter()
            .enumerate()
            .map(|(i, q)| self.question_item(q, i == self.selected, &snap.intake_responses))
            .collect();
        let title = match (has_advanced, self.show_advanced) {
            (true, false) => " Questions  (a: show advanced) ",
            (true, true) => " Questions  (a: hide advanced) ",
            (false, _) => " Questions ",
        };
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(list, chunks[1]);

        if !snap.files.is_empty() {
            let files: Vec<ListItem> = snap.files.iter().map(|file| ListItem::new(file_line(file))).collect();
            let list = List::new(files).block(Block::default().borders(Borders::ALL).title(" Documents "));
            f.render_widget(list, chunks[2]);
        }

        let footer = if snap.can_start_chat {
            Line::from(vec![
                Span::styled("s", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::raw(" Start chat · "),
                Span::styled(self.hint(bot), Style::default().fg(Color::DarkGray)),
            ])
        } else {
            Line::from(vec![
                Span::styled(
                    "Answer the questions marked * to start · ",
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(self.hint(bot), Style::default().fg(Color::DarkGray)),
            ])
        };
        f.render_widget(
            Paragraph::new(footer)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::TOP)),
            chunks[3],
        );
    }

    fn hint(&self, bot: &BotDemoConfig) -> &'static str {
        let kind = self.visible(bot).get(self.selected).map(|q| q.kind);
        match (self.editing, kind) {
            (true, _) => "Type your answer · Enter to save · Esc to cancel",
            (false, Some(QuestionKind::Select)) => "← → to choose · Backspace to clear",
            (false, Some(QuestionKind::Multiselect)) => "← → to move · Space to toggle",
            (false, _) => "Enter to answer · ↑/↓ to move",
        }
    }

    fn question_item(&self, q: &IntakeQuestion, selected: bool, responses: &IntakeResponses) -> ListItem<'static> {
        let marker = if q.required { " *" } else { "" };
        let prefix = if selected { "▸ " } else { "  " };
        let label = Line::from(Span::styled(
            format!("{prefix}{}{marker}", q.question),
            field_style(selected, selected && self.editing),
        ));

        let answer = responses.get(&q.id);
        let value = match q.kind {
            QuestionKind::Text | QuestionKind::Textarea if selected && self.editing => {
                format!("{}▏", self.buffer)
            }
            QuestionKind::Text | QuestionKind::Textarea => match answer {
                Some(a) if a.is_answered() => a.display(),
                _ => q.placeholder.clone().unwrap_or_default(),
            },
            QuestionKind::Select => match answer {
                Some(a) if a.is_answered() => format!("< {} >", a.display()),
                _ => "< choose >".to_string(),
            },
            QuestionKind::Multiselect => {
                let chosen: &[String] = match answer {
                    Some(IntakeAnswer::Multi(values)) => values.as_slice(),
                    _ => &[],
                };
                q.options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| {
                        let mark = if chosen.contains(o) { "x" } else { " " };
                        if selected && i == self.option_cursor {
                            format!("▸[{mark}] {o}")
                        } else {
                            format!("[{mark}] {o}")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("  ")
            }
        };
        let value = Line::from(Span::styled(
            format!("    {value}"),
            Style::default().fg(if answer.is_some_and(IntakeAnswer::is_answered) {
                Color::White
            } else {
                Color::DarkGray
            }),
        ));

        ListItem::new(vec![label, value])
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        _modifiers: KeyModifiers,
        bot: &BotDemoConfig,
        responses: &IntakeResponses,
    ) -> Action {
        let visible = self.visible(bot);
        let Some(question) = visible.get(self.selected).copied() else {
            self.selected = 0;
            return match code {
                KeyCode::Char('a') => {
                    self.show_advanced = !self.show_advanced;
                    Action::None
                }
                KeyCode::Char('s') => Action::StartChat,
                _ => Action::None,
            };
        };

        if self.editing {
            return match code {
                KeyCode::Esc => {
                    self.editing = false;
                    Action::None
                }
                KeyCode::Enter => {
                    self.editing = false;
                    Action::Answer(question.id.clone(), std::mem::take(&mut self.buffer).into())
                }
                KeyCode::Backspace => {
                    self.buffer.pop();
                    Action::None
                }
                KeyCode::Char(c) => {
                    self.buffer.push(c);
                    Action::None
                }
                _ => Action::None,
            };
        }

        match code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                self.option_cursor = 0;
                Action::None
            }
            KeyCode::Down => {
                if self.selected + 1 < visible.len() {
                    self.selected += 1;
                }
                self.option_cursor = 0;
                Action::None
            }
            KeyCode::Char('a') => {
                self.show_advanced = !self.show_advanced;
                let count = self.visible(bot).len();
                self.selected = self.selected.min(count.saturating_sub(1));
                Action::None
            }
            KeyCode::Char('s') => Action::StartChat,
            KeyCode::Enter if !question.kind.has_options() => {
                self.buffer = responses
                    .get(&question.id)
                    .map(IntakeAnswer::display)
                    .unwrap_or_default();
                self.editing = true;
                Action::None
            }
            KeyCode::Backspace => Action::ClearAnswer(question.id.clone()),
            KeyCode::Left | KeyCode::Right if question.kind == QuestionKind::Select => {
                let forward = code == KeyCode::Right;
                let current = responses
                    .get(&question.id)
                    .and_then(|a| question.options.iter().position(|o| *o == a.display()));
                let next = cycle(current, question.options.len(), forward);
                match next.and_then(|i| question.options.get(i)) {
                    Some(option) => Action::Answer(question.id.clone(), option.as_str().into()),
                    None => Action::None,
                }
            }
            KeyCode::Left if question.kind == QuestionKind::Multiselect => {
                self.option_cursor = self.option_cursor.saturating_sub(1);
                Action::None
            }
            KeyCode::Right if question.kind == QuestionKind::Multiselect => {
                if self.option_cursor + 1 < question.options.len() {
                    self.option_cursor += 1;
                }
                Action::None
            }
            KeyCode::Char(' ') if question.kind == QuestionKind::Multiselect => {
                let Some(option) = question.options.get(self.option_cursor) else {
                    return Action::None;
                };
                let mut chosen = match responses.get(&question.id) {
                    Some(IntakeAnswer::Multi(values)) => values.clone(),
                    _ => Vec::new(),
                };
                match chosen.iter().position(|v| v == option) {
                    Some(i) => {
                        chosen.remove(i);
                    }
                    None => chosen.push(option.clone()),
                }
                // Keep declared option order.
                chosen.sort_by_key(|v| question.options.iter().position(|o| o == v));
                Action::Answer(question.id.clone(), chosen.into())
            }
            _ => Action::None,
        }
    }

    /// Back to the first question with nothing being edited.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

fn cycle(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    })
}
