use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::authz;

use super::{App, ComposeState, DetailFocus, DetailState, FeedState, LoginState, RegisterState, Screen};

// ---------------------------------------------------------------------------
// Frame layout
// ---------------------------------------------------------------------------

pub fn render(app: &App, frame: &mut Frame) {
    let [main, status, footer] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    match &app.screen {
        Screen::Feed(state) => render_feed(app, state, frame, main),
        Screen::Detail(state) => render_detail(app, state, frame, main),
        Screen::Login(state) => render_login(state, frame, main),
        Screen::Register(state) => render_register(state, frame, main),
        Screen::Compose(state) => render_compose(state, frame, main),
    }

    if let Some(message) = &app.status {
        frame.render_widget(
            Paragraph::new(message.as_str()).style(Style::default().fg(Color::Yellow)),
            status,
        );
    }

    frame.render_widget(
        Paragraph::new(footer_hints(app)).style(Style::default().fg(Color::DarkGray)),
        footer,
    );
}

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

fn render_feed(app: &App, state: &FeedState, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" News ");

    if state.loading {
        frame.render_widget(Paragraph::new("Loading news...").block(block), area);
        return;
    }
    if let Some(error) = &state.error {
        frame.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = match app.collections.news() {
        Some(news) if !news.is_empty() => news
            .iter()
            .map(|n| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        n.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  by {}  {}", n.author_label(), n.publication_date),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect(),
        _ => vec![ListItem::new("No news yet")],
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_detail(app: &App, state: &DetailState, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Article ");

    if state.loading {
        frame.render_widget(Paragraph::new("Loading...").block(block), area);
        return;
    }
    if let Some(error) = &state.error {
        frame.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .block(block),
            area,
        );
        return;
    }
    let Some(news) = &state.news else {
        frame.render_widget(Paragraph::new("Not found").block(block), area);
        return;
    };

    let [article_area, thread_area, input_area] = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Min(3),
        Constraint::Length(3),
    ])
    .areas(area);

    // article
    let mut lines = vec![
        Line::from(Span::styled(
            news.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("by {}  {}", news.author_label(), news.publication_date),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    for text_line in news.content.text.lines() {
        lines.push(Line::from(text_line.to_string()));
    }
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        article_area,
    );

    // comment thread
    let comments = app.collections.comments(state.news_id).unwrap_or(&[]);
    let mut items = Vec::new();
    for comment in comments {
        let mut comment_lines = vec![Line::from(vec![
            Span::styled(
                comment.author_label(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", comment.publication_date),
                Style::default().fg(Color::DarkGray),
            ),
        ])];
        if app.edits.is_open(comment.id) {
            let marker = if app.edits.is_saving(comment.id) {
                "[saving] "
            } else {
                "[editing] "
            };
            comment_lines.push(Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::raw(app.edits.draft(comment.id).unwrap_or("").to_string()),
            ]));
        } else {
            for text_line in comment.text.lines() {
                comment_lines.push(Line::from(text_line.to_string()));
            }
        }
        items.push(ListItem::new(comment_lines));
    }
    if comments.is_empty() {
        items.push(ListItem::new("No comments yet"));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Comments ({}) ", comments.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    frame.render_stateful_widget(list, thread_area, &mut list_state);

    // comment box
    let (input_title, input_text) = if app.session.is_authenticated() {
        (" New comment ", state.comment_draft.as_str())
    } else {
        (" Log in to comment ", "")
    };
    let border_style = if state.focus == DetailFocus::CommentBox {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    frame.render_widget(
        Paragraph::new(input_text).block(
            Block::default()
                .borders(Borders::ALL)
                .title(input_title)
                .border_style(border_style),
        ),
        input_area,
    );
}

fn render_login(state: &LoginState, frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        field_line("Email", &state.username, state.field == 0, false),
        field_line("Password", &state.password, state.field == 1, true),
        Line::from(""),
    ];
    if state.submitting {
        lines.push(Line::from(Span::styled(
            "Signing in...",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Log in ")),
        area,
    );
}

fn render_register(state: &RegisterState, frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        field_line("Login", &state.name, state.field == 0, false),
        field_line("Email", &state.email, state.field == 1, false),
        field_line("Password", &state.password, state.field == 2, true),
        Line::from(""),
    ];
    if state.submitting {
        lines.push(Line::from(Span::styled(
            "Registering...",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Register ")),
        area,
    );
}

fn render_compose(state: &ComposeState, frame: &mut Frame, area: Rect) {
    let title = if state.target.is_some() {
        " Edit news "
    } else {
        " New news "
    };

    let mut lines = vec![
        field_line("Title", &state.title, state.field == 0, false),
        field_line("Cover", &state.cover, state.field == 1, false),
        Line::from(""),
        Line::from(Span::styled(
            if state.field == 2 { "Text ▾" } else { "Text" },
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    for text_line in state.text.lines() {
        lines.push(Line::from(text_line.to_string()));
    }
    if state.text.ends_with('\n') || state.text.is_empty() {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(""));
    if state.submitting {
        lines.push(Line::from(Span::styled(
            "Publishing...",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn field_line(label: &str, value: &str, focused: bool, mask: bool) -> Line<'static> {
    let shown = if mask {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let cursor = if focused { "▏" } else { "" };
    let style = if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{:>10}: ", label), style),
        Span::raw(format!("{}{}", shown, cursor)),
    ])
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

/// Context-sensitive key hints.  Edit/delete hints only appear when the
/// authorization policy grants them; the keys themselves are also gated, so
/// the footer is a mirror of the policy, not the enforcement point.
fn footer_hints(app: &App) -> String {
    let principal = app.session.principal();
    match &app.screen {
        Screen::Feed(_) => {
            let mut hints = vec!["↑/↓ select", "Enter open", "r refresh"];
            if app.session.is_authenticated() {
                if authz::can_create_news(principal) {
                    hints.push("n new");
                }
                hints.push("o log out");
            } else {
                hints.push("l log in");
                hints.push("g register");
            }
            hints.push("q quit");
            hints.join("  ")
        }
        Screen::Detail(state) => match state.focus {
            DetailFocus::CommentBox => "Enter send  Esc done".to_string(),
            DetailFocus::Edit(_) => "Enter save  Esc cancel".to_string(),
            DetailFocus::Thread => {
                let mut hints = vec!["Esc back", "↑/↓ select", "r refresh"];
                if app.session.is_authenticated() {
                    hints.push("c comment");
                }
                let selected = app.selected_comment();
                if selected
                    .as_ref()
                    .map(|c| authz::can_modify(principal, c))
                    .unwrap_or(false)
                {
                    hints.push("e edit");
                    hints.push("d delete");
                }
                if state
                    .news
                    .as_ref()
                    .map(|n| authz::can_modify(principal, n))
                    .unwrap_or(false)
                {
                    hints.push("E edit news");
                    hints.push("D delete news");
                }
                hints.push("q quit");
                hints.join("  ")
            }
        },
        Screen::Login(_) => "Tab next field  Enter submit  Esc back".to_string(),
        Screen::Register(_) => "Tab next field  Enter submit  Esc back".to_string(),
        Screen::Compose(_) => "Tab next field  Ctrl+S publish  Esc back".to_string(),
    }
}
