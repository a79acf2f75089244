use chrono::Local;
use mrag_core::{ChatRole, Connectivity, UploadPhase};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, InputMode, Screen, TextInput};

/// Toasts shown at once; older ones wait their turn
const MAX_VISIBLE_TOASTS: usize = 4;
const TOAST_WIDTH: u16 = 48;

fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Area of `width` x `height` centered in `area`, clipped to fit
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Landing => render_landing_screen(app, frame, body_area),
        Screen::Upload => render_upload_screen(app, frame, body_area),
        Screen::Workspace => render_workspace_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
    render_toasts(app, frame, body_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let base = Style::default().bg(theme.header_bg).fg(theme.header_fg);

    let mut title = vec![
        Span::styled(" MRAG ", Style::default().fg(theme.accent).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(theme.muted),
        ),
    ];
    if app.screen == Screen::Workspace {
        if let Some(doc) = app.session.active_document() {
            title.push(Span::raw("  "));
            title.push(Span::styled(doc.display_name.clone(), Style::default().bold()));
        }
    }

    let connectivity = app.session.connectivity();
    let status = Line::from(vec![
        Span::styled("● ", Style::default().fg(theme.connectivity_color(connectivity))),
        Span::raw(connectivity.as_str()),
        Span::raw(" "),
    ])
    .alignment(Alignment::Right);

    let [left, right] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(14)]).areas(area);
    frame.render_widget(Paragraph::new(Line::from(title)).style(base), left);
    frame.render_widget(Paragraph::new(status).style(base), right);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(theme.accent).fg(theme.header_bg),
        InputMode::Editing => Style::default().bg(theme.warning).fg(theme.header_bg),
    };

    let mode_text = match app.screen {
        Screen::Landing => " HOME ",
        Screen::Upload => " UPLOAD ",
        Screen::Workspace => " CHAT ",
    };

    let key_style = Style::default().bg(theme.border).fg(theme.text);
    let label_style = Style::default().fg(theme.text);
    let hint = |keys: &'static str, label: &'static str| {
        [Span::styled(keys, key_style), Span::styled(label, label_style)]
    };

    let pairs: Vec<[Span; 2]> = match (app.screen, app.input_mode) {
        (Screen::Landing, _) => vec![
            hint(" Enter ", " get started "),
            hint(" t ", " theme "),
            hint(" q ", " quit "),
        ],
        (Screen::Upload, InputMode::Editing) => vec![
            hint(" Enter ", " upload "),
            hint(" Esc ", " cancel "),
            hint(" ^U ", " clear "),
        ],
        (Screen::Upload, InputMode::Normal) => vec![
            hint(" i ", " edit path "),
            hint(" r ", " retry "),
            hint(" x ", " dismiss "),
            hint(" h ", " home "),
            hint(" q ", " quit "),
        ],
        (Screen::Workspace, InputMode::Editing) => vec![
            hint(" Enter ", " ask "),
            hint(" Esc ", " done "),
        ],
        (Screen::Workspace, InputMode::Normal) => vec![
            hint(" i ", " ask "),
            hint(" j/k ", " scroll "),
            hint(" [/] ", " document "),
            hint(" u ", " upload "),
            hint(" o ", " open "),
            hint(" r ", " retry "),
            hint(" x ", " dismiss "),
            hint(" t ", " theme "),
            hint(" q ", " quit "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(pairs.into_iter().flatten());
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_landing_screen(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let popup = centered_rect(60, 15, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused));

    let step = |n: &'static str, title: &'static str, body: &'static str| {
        Line::from(vec![
            Span::styled(n, Style::default().fg(theme.accent).bold()),
            Span::styled(title, Style::default().bold()),
            Span::styled(body, Style::default().fg(theme.muted)),
        ])
    };

    let text = Text::from(vec![
        Line::from(Span::styled("MRAG", Style::default().fg(theme.accent).bold())),
        Line::from("Chat with your PDF documents"),
        Line::default(),
        step("1 ", "Upload", "  a PDF and let the backend index it"),
        step("2 ", "Ask", "  questions in plain language"),
        step("3 ", "Read", "  answers with the pages they came from"),
        Line::default(),
        Line::from(Span::styled(
            format!("Backend: {}", app.api_base_url),
            Style::default().fg(theme.muted),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to get started",
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
        )),
    ]);

    let landing = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(landing, popup);
}

/// Visible slice of `input` and the cursor column inside `width`
fn scrolled_input(input: &TextInput, width: usize) -> (String, u16) {
    let cursor_pos = input.cursor;
    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if width == 0 {
        0
    } else if cursor_pos >= width {
        cursor_pos - width + 1
    } else {
        0
    };
    let visible: String = input.value.chars().skip(scroll_offset).take(width).collect();
    (visible, (cursor_pos - scroll_offset) as u16)
}

fn render_upload_screen(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let popup = centered_rect(70, 12, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .title(" Upload a PDF ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [intro_area, input_area, status_area, detail_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(inner);

    let intro = Paragraph::new("Type or drop the path of a PDF file and press Enter.")
        .style(Style::default().fg(theme.muted))
        .wrap(Wrap { trim: true });
    frame.render_widget(intro, intro_area);

    let uploading = app.session.is_uploading();
    let editing = app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { theme.border_focused } else { theme.border }))
        .title(" Path ");
    let (visible, cursor_x) =
        scrolled_input(&app.path_input, input_area.width.saturating_sub(2) as usize);
    let input = Paragraph::new(visible)
        .style(Style::default().fg(if uploading { theme.muted } else { theme.user }))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing && !uploading {
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    match app.session.upload_phase() {
        UploadPhase::Transferring | UploadPhase::Completing => {
            let label = if app.session.upload_phase() == UploadPhase::Completing {
                "Processing document..."
            } else {
                "Uploading..."
            };
            let progress = app.session.upload_progress().min(100);
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(theme.accent))
                .percent(progress as u16)
                .label(format!("{}% {}", progress, label));
            frame.render_widget(gauge, Rect { height: 1, ..status_area });
        }
        UploadPhase::Idle | UploadPhase::Succeeded => {
            if let Some(error) = app.session.upload_error() {
                let error = Paragraph::new(format!("Upload failed: {}", error))
                    .style(Style::default().fg(theme.error))
                    .wrap(Wrap { trim: true });
                frame.render_widget(error, status_area);
            }
        }
    }

    let documents = app.session.documents().len();
    let detail = if documents > 0 {
        format!("{} document(s) loaded. Esc returns to the chat.", documents)
    } else {
        "Only .pdf files are accepted.".to_string()
    };
    frame.render_widget(
        Paragraph::new(detail).style(Style::default().fg(theme.muted)),
        detail_area,
    );
}

fn render_workspace_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_column, viewer_area] = Layout::horizontal([
        Constraint::Percentage(58),
        Constraint::Percentage(42),
    ])
    .areas(area);

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(chat_column);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_chat(app, frame, chat_area);
    render_query_input(app, frame, input_area);
    render_viewer(app, frame, viewer_area);
}

fn render_chat(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let session = &app.session;

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(" Chat ");

    let chat_text = if session.messages().is_empty() && !session.is_querying() {
        let hint = match session.active_document() {
            Some(doc) => format!("Ask a question about {}...", doc.display_name),
            None => "Upload a PDF to start asking questions.".to_string(),
        };
        Text::from(Span::styled(hint, Style::default().fg(theme.muted)))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in session.messages() {
            let time = msg.timestamp.with_timezone(&Local).format("%H:%M").to_string();
            match msg.role {
                ChatRole::User => {
                    let mut role = vec![
                        Span::styled("You:", Style::default().fg(theme.user).add_modifier(Modifier::BOLD)),
                        Span::styled(format!(" {}", time), Style::default().fg(theme.muted)),
                    ];
                    if session.is_provisional(msg) {
                        role.push(Span::styled(" sending", Style::default().fg(theme.muted).italic()));
                    }
                    lines.push(Line::from(role));
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(vec![
                        Span::styled("AI:", Style::default().fg(theme.assistant).add_modifier(Modifier::BOLD)),
                        Span::styled(format!(" {}", time), Style::default().fg(theme.muted)),
                    ]));
                    for line in msg.content.lines() {
                        if msg.is_error {
                            lines.push(Line::from(Span::styled(
                                line.to_string(),
                                Style::default().fg(theme.error),
                            )));
                        } else {
                            lines.push(parse_markdown_line(line));
                        }
                    }
                }
            }
            let pages = msg.cited_pages();
            if !pages.is_empty() {
                let pages: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
                lines.push(Line::from(Span::styled(
                    format!("Sources: p. {}", pages.join(", ")),
                    Style::default().fg(theme.muted),
                )));
            }
            lines.push(Line::default());
        }

        if session.is_querying() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(theme.assistant).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_query_input(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let session = &app.session;
    let enabled = app.query_input_enabled();
    let editing = app.input_mode == InputMode::Editing;

    let title = if session.is_querying() {
        " Waiting for answer... ".to_string()
    } else if session.connectivity() == Connectivity::Offline {
        " Backend offline (r to retry) ".to_string()
    } else if session.connectivity() == Connectivity::Checking {
        " Connecting... ".to_string()
    } else {
        " Ask (i to type) ".to_string()
    };

    let border_color = if editing && enabled { theme.border_focused } else { theme.border };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let (visible, cursor_x) =
        scrolled_input(&app.query_input, area.width.saturating_sub(2) as usize);
    let input = Paragraph::new(visible)
        .style(Style::default().fg(if enabled { theme.user } else { theme.muted }))
        .block(input_block);
    frame.render_widget(input, area);

    // Show cursor when editing
    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_viewer(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let session = &app.session;

    let sources = session
        .last_reply()
        .map(|reply| reply.citations.len())
        .unwrap_or(0);
    let documents = session.documents().len();

    let [info_area, sources_area, docs_area] = Layout::vertical([
        Constraint::Length(7),
        Constraint::Min(3),
        Constraint::Length((documents.min(6) + 2) as u16),
    ])
    .areas(area);

    // Document details
    let info_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(" Document ");
    let info = match session.active_document() {
        Some(doc) => {
            let label = |text: &'static str| Span::styled(text, Style::default().fg(theme.muted));
            let mut lines = vec![
                Line::from(Span::styled(doc.display_name.clone(), Style::default().bold())),
                Line::from(vec![label("ID       "), Span::raw(doc.id.clone())]),
                Line::from(vec![
                    label("Uploaded "),
                    Span::raw(doc.uploaded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()),
                ]),
            ];
            if let Some(url) = session.preview_url() {
                lines.push(Line::from(vec![
                    label("Preview  "),
                    Span::styled(url, Style::default().fg(theme.info).underlined()),
                ]));
            }
            Text::from(lines)
        }
        None => Text::from(Span::styled("No document loaded", Style::default().fg(theme.muted))),
    };
    frame.render_widget(
        Paragraph::new(info).block(info_block).wrap(Wrap { trim: false }),
        info_area,
    );

    // Citations of the latest answer
    let sources_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(format!(" Sources ({}) ", sources));
    let source_items: Vec<ListItem> = session
        .last_reply()
        .map(|reply| {
            reply
                .citations
                .iter()
                .map(|citation| {
                    let mut header = vec![Span::styled(
                        format!("Page {}", citation.page),
                        Style::default().fg(theme.accent).bold(),
                    )];
                    if let Some(score) = citation.score {
                        header.push(Span::styled(
                            format!("  score {:.2}", score),
                            Style::default().fg(theme.muted),
                        ));
                    }
                    let mut lines = vec![Line::from(header)];
                    if let Some(excerpt) = &citation.excerpt {
                        let width = sources_area.width.saturating_sub(4) as usize;
                        let short: String = excerpt.split_whitespace().collect::<Vec<_>>().join(" ");
                        let short = if short.chars().count() > width && width > 3 {
                            format!("{}...", short.chars().take(width - 3).collect::<String>())
                        } else {
                            short
                        };
                        lines.push(Line::from(Span::styled(short, Style::default().fg(theme.muted))));
                    }
                    ListItem::new(lines)
                })
                .collect()
        })
        .unwrap_or_default();
    if source_items.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Pages cited by the latest answer appear here.",
                Style::default().fg(theme.muted),
            ))
            .block(sources_block)
            .wrap(Wrap { trim: true }),
            sources_area,
        );
    } else {
        frame.render_widget(List::new(source_items).block(sources_block), sources_area);
    }

    // Document switcher
    let remote = session
        .remote_document_count()
        .map(|count| format!(" {} on server ", count))
        .unwrap_or_default();
    let docs_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(format!(" Documents ([ ]) {}", remote));
    let active = session.active_index();
    let doc_items: Vec<ListItem> = session
        .documents()
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            if Some(i) == active {
                ListItem::new(format!("> {}", doc.display_name))
                    .style(Style::default().fg(theme.accent).bold())
            } else {
                ListItem::new(format!("  {}", doc.display_name))
            }
        })
        .collect();
    frame.render_widget(List::new(doc_items).block(docs_block), docs_area);
}

fn render_toasts(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let width = TOAST_WIDTH.min(area.width.saturating_sub(2));
    if width < 10 {
        return;
    }

    let mut y = area.y;
    for notification in app.session.notifications().iter().rev().take(MAX_VISIBLE_TOASTS) {
        let color = theme.notification_color(notification.kind);
        let text_width = width.saturating_sub(2) as usize;
        let lines = (notification.text.chars().count() / text_width.max(1) + 1) as u16;
        let height = lines.min(3) + 2;
        if y + height > area.y + area.height {
            break;
        }

        let toast_area = Rect::new(area.x + area.width - width - 1, y, width, height);
        frame.render_widget(Clear, toast_area);
        let toast = Paragraph::new(notification.text.clone())
            .style(Style::default().fg(theme.text))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(toast, toast_area);
        y += height;
    }
}
