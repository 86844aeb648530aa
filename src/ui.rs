use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap};

use crate::app::{App, Mode};
use crate::router::PROJECT_MARKER;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let size = frame.area();
    let theme = Theme::terminal();

    match app.mode {
        Mode::Login => draw_login(frame, app, size, &theme),
        Mode::Launcher => draw_launcher(frame, app, size, &theme),
    }

    if let Some(toast) = app.active_toast() {
        draw_toast(frame, size, &toast.message, toast.is_error, &theme);
    }
}

fn draw_launcher(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let content = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(2)])
        .split(content);

    let prompt = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} ", app.keyword()),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw(app.input.as_str()),
        Span::styled("▏", theme.muted_style()),
    ]))
    .block(panel_block("Toggl", theme));
    frame.render_widget(prompt, chunks[0]);

    let items = app
        .results
        .iter()
        .map(|option| {
            let title_style = if option.action.is_some() {
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD)
            } else {
                theme.muted_style()
            };
            let mut lines = vec![Line::from(Span::styled(option.title.clone(), title_style))];
            if let Some(description) = &option.description {
                lines.push(Line::from(Span::styled(
                    format!("  {}", description),
                    theme.muted_style(),
                )));
            }
            ListItem::new(lines)
        })
        .collect::<Vec<_>>();

    let list = List::new(items)
        .block(panel_block("Results", theme))
        .highlight_style(
            Style::default()
                .bg(theme.accent)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("› ");
    frame.render_stateful_widget(list, chunks[1], &mut app.result_state);

    frame.render_widget(Paragraph::new(footer_line(app, theme)), chunks[2]);
}

fn footer_line(app: &App, theme: &Theme) -> Line<'static> {
    let refreshed = app
        .last_refresh()
        .map(|time| format!("synced {}", time.format("%H:%M:%S")))
        .unwrap_or_else(|| "not synced".to_string());
    Line::from(vec![
        Span::styled("Enter", theme.title_style()),
        Span::styled(" select  ", theme.muted_style()),
        Span::styled("↑↓", theme.title_style()),
        Span::styled(" move  ", theme.muted_style()),
        Span::styled(PROJECT_MARKER, theme.title_style()),
        Span::styled(" pick project  ", theme.muted_style()),
        Span::styled("Esc", theme.title_style()),
        Span::styled(" clear/quit  ", theme.muted_style()),
        Span::styled(refreshed, theme.muted_style()),
    ])
}

fn draw_login(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let block = centered_rect(70, 30, area);
    frame.render_widget(Clear, block);
    let mut lines = vec![
        Line::from("Enter your Toggl API token"),
        Line::from("Find it in https://track.toggl.com/profile"),
        Line::from(""),
        Line::from(vec![
            Span::styled("Token: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(mask_token(&app.input)),
        ]),
        Line::from(""),
        Line::from("Press Enter to save, Esc to quit"),
    ];

    if let Some(status) = &app.status {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(theme.error),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(panel_block("Login", theme))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, block);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    vertical[1]
}

fn draw_toast(frame: &mut Frame, area: Rect, message: &str, is_error: bool, theme: &Theme) {
    let max_width = area.width.saturating_sub(2);
    let width = (message.chars().count() as u16 + 6)
        .min(max_width)
        .max(max_width.min(20));
    let height = 3.min(area.height);
    let x = area.x + area.width.saturating_sub(width + 1);
    let y = area.y + area.height.saturating_sub(height + 4);
    let rect = Rect::new(x, y, width, height);

    frame.render_widget(Clear, rect);
    let (style, title) = if is_error {
        (Style::default().fg(theme.error).add_modifier(Modifier::BOLD), "Error")
    } else {
        (Style::default().fg(theme.success).add_modifier(Modifier::BOLD), "Done")
    };
    let paragraph = Paragraph::new(Line::from(Span::styled(message.to_string(), style)))
        .alignment(Alignment::Center)
        .block(panel_block(title, theme));
    frame.render_widget(paragraph, rect);
}

fn panel_block(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(Line::from(Span::styled(
            format!(" {} ", title),
            theme.title_style(),
        )))
}

fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail = token.chars().skip(count - 4).collect::<String>();
    format!("{}{}", "*".repeat(count - 4), tail)
}

struct Theme {
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    success: Color,
    error: Color,
}

impl Theme {
    fn terminal() -> Self {
        Theme {
            border: Color::DarkGray,
            text: Color::Reset,
            muted: Color::DarkGray,
            accent: Color::Blue,
            success: Color::Green,
            error: Color::Red,
        }
    }

    fn title_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }
}
