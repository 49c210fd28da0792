use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskflow_shared::{Priority, Task};
use tui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use uuid::Uuid;

use crate::app::{AddState, App, LoadState, SuggestionState};

/// Tallest the suggestion panel grows, borders included.
const MAX_PANEL_HEIGHT: u16 = 12;

fn panel_height(subtasks: usize) -> u16 {
    u16::try_from(subtasks)
        .unwrap_or(u16::MAX)
        .saturating_add(3)
        .min(MAX_PANEL_HEIGHT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Editing,
}

/// What a key press asks the app to do.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Add { title: String, priority: Priority },
    Toggle(Uuid),
    Delete(Uuid),
    Suggest(Uuid),
    Dismiss,
    Accept,
}

/// Purely local screen state: cursor, form contents, input mode.
#[derive(Debug, Default)]
pub struct Screen {
    pub mode: Mode,
    pub input: String,
    pub priority: Priority,
    pub selected: usize,
}

impl Screen {
    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn on_key(&mut self, key: KeyEvent, tasks: &[Task]) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        match self.mode {
            Mode::Editing => self.on_editing_key(key),
            Mode::Normal => self.on_normal_key(key, tasks),
        }
    }

    fn on_editing_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Tab => self.priority = self.priority.next(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                let title = std::mem::take(&mut self.input);
                let priority = std::mem::take(&mut self.priority);
                self.mode = Mode::Normal;
                return Action::Add { title, priority };
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        Action::None
    }

    fn on_normal_key(&mut self, key: KeyEvent, tasks: &[Task]) -> Action {
        let current = tasks.get(self.selected).map(|t| t.id);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('a') | KeyCode::Char('i') => {
                self.mode = Mode::Editing;
                Action::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < tasks.len() {
                    self.selected += 1;
                }
                Action::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                Action::None
            }
            KeyCode::Char(' ') | KeyCode::Enter => current.map_or(Action::None, Action::Toggle),
            KeyCode::Char('d') => current.map_or(Action::None, Action::Delete),
            KeyCode::Char('s') => current.map_or(Action::None, Action::Suggest),
            KeyCode::Char('x') => Action::Dismiss,
            KeyCode::Char('r') => Action::Accept,
            _ => Action::None,
        }
    }
}

/// Runs `action` against the app. Returns `true` when the user asked to quit.
pub fn dispatch(app: &mut App, action: Action) -> bool {
    match action {
        Action::None => {}
        Action::Quit => return true,
        Action::Add { title, priority } => {
            if !app.add(&title, priority) {
                log::debug!("add ignored: blank title or submit in flight");
            }
        }
        Action::Toggle(id) => {
            app.toggle(id);
        }
        Action::Delete(id) => {
            app.delete(id);
        }
        Action::Suggest(id) => {
            if !app.request_suggestion(id) {
                log::debug!("suggestion already pending; ignoring request for {id}");
            }
        }
        Action::Dismiss => app.dismiss_suggestion(),
        Action::Accept => app.accept_suggestion(),
    }
    false
}

fn priority_style(priority: Priority) -> Style {
    let color = match priority {
        Priority::Low => Color::Green,
        Priority::Medium => Color::Yellow,
        Priority::High => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn draw<B: Backend>(f: &mut Frame<B>, app: &App, screen: &Screen) {
    let suggestion = app.visible_suggestion();
    let panel_rows = suggestion.map_or(0, |(_, s)| panel_height(s.subtasks.len()));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(panel_rows),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    let tasks = app.tasks();
    let (done, total) = app.counts();

    let header = Paragraph::new(Spans::from(vec![
        Span::styled("TaskFlow", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {done}/{total} completed")),
    ]));
    f.render_widget(header, chunks[0]);

    draw_form(f, app, screen, chunks[1]);
    draw_tasks(f, app, &tasks, screen, chunks[2]);

    if let Some((_, suggestion)) = suggestion {
        let mut lines = vec![Spans::from(Span::styled(
            suggestion.refined_title.clone(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ))];
        lines.extend(
            suggestion
                .subtasks
                .iter()
                .map(|step| Spans::from(Span::raw(format!("  • {step}")))),
        );
        let panel = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("AI refinement"))
            .wrap(Wrap { trim: true });
        f.render_widget(panel, chunks[3]);
    }

    let help = match screen.mode {
        Mode::Editing => "enter: add  tab: priority  esc: cancel",
        Mode::Normal => "a: add  space: toggle  d: delete  s: suggest  r: use suggestion  x: dismiss  q: quit",
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[4],
    );
}

fn draw_form<B: Backend>(f: &mut Frame<B>, app: &App, screen: &Screen, area: Rect) {
    let border = if screen.mode == Mode::Editing {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let form = Paragraph::new(Spans::from(vec![
        Span::raw(screen.input.clone()),
        Span::raw("  "),
        Span::styled(format!("[{}]", screen.priority), priority_style(screen.priority)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(match app.add_state() {
                AddState::Idle => "New task",
                AddState::Submitting => "New task (adding...)",
            }),
    );
    f.render_widget(form, area);
}

fn draw_tasks<B: Backend>(f: &mut Frame<B>, app: &App, tasks: &[Task], screen: &Screen, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Tasks");

    if app.load_state() == LoadState::Loading || tasks.is_empty() {
        let message = if app.load_state() == LoadState::Loading {
            "Fetching your agenda..."
        } else {
            "Clear skies ahead"
        };
        let empty = Paragraph::new(message)
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    }

    let pending = match app.suggestion_state() {
        SuggestionState::Pending { task_id } => Some(*task_id),
        _ => None,
    };

    let items: Vec<ListItem> = tasks
        .iter()
        .map(|task| {
            let check = if task.completed { "[x] " } else { "[ ] " };
            let title_style = if task.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw(check),
                Span::styled(task.title.clone(), title_style),
                Span::raw(" "),
                Span::styled(task.priority.to_string(), priority_style(task.priority)),
                Span::styled(
                    format!(" {}", task.created_at.format("%H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if pending == Some(task.id) {
                spans.push(Span::styled(" thinking...", Style::default().fg(Color::Magenta)));
            }
            ListItem::new(Spans::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    state.select(Some(screen.selected));
    f.render_stateful_widget(list, area, &mut state);
}
