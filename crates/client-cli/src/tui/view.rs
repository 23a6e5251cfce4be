//! Rendering. Everything here reads [`App`] and draws; no state changes.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use super::app::App;
use crate::dashboard::admin::AdminTab;
use crate::dashboard::contact_detail::BACK_TO_CONTACTS;
use crate::format::{self, Tone};
use crate::forms::{EditableForm, FieldKind};
use crate::nav::{Route, Section};

const RETRY_HINT: &str = "Press r to try again";

pub(super) fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if app.route.is_login() {
        draw_login(frame, app, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(0)])
        .split(rows[0]);
    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(columns[1]);

    draw_sidebar(frame, app, columns[0]);
    draw_header(frame, app, body[0]);
    draw_screen(frame, app, body[1]);
    draw_status_bar(frame, app, rows[1]);

    if !matches!(app.route, Route::ContactForm(_)) {
        if let Some(form) = app.active_form() {
            draw_form(frame, form, app.field, popup(body[1], 70, 80));
        }
    }
    if let Some(pending) = app.confirm {
        let area = popup(body[1], 50, 20);
        frame.render_widget(Clear, area);
        let text = vec![
            Line::from(pending.prompt()),
            Line::from(""),
            Line::from("y: confirm   any other key: keep").style(Style::default().fg(Color::DarkGray)),
        ];
        let block = Block::default()
            .title(" Confirm ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Blue => Color::Blue,
        Tone::Yellow => Color::Yellow,
        Tone::Purple => Color::Magenta,
        Tone::Green => Color::Green,
        Tone::Gray => Color::Gray,
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
}

fn muted(text: &str) -> Line<'_> {
    Line::from(text).style(Style::default().fg(Color::DarkGray))
}

fn notice(text: &str) -> Line<'_> {
    Line::from(text).style(Style::default().fg(Color::Red))
}

/// Loading and failed-load placeholders while nothing for the current
/// selection has loaded.
fn placeholder(shown: bool, error: Option<&str>) -> Option<Vec<Line<'_>>> {
    if shown {
        return None;
    }
    Some(match error {
        Some(error) => vec![notice(error), Line::from(""), muted(RETRY_HINT)],
        None => vec![muted("Loading...")],
    })
}

/// A failed refetch above data that is still shown. Returns the area left.
fn retry_banner(frame: &mut Frame, area: Rect, error: Option<&str>) -> Rect {
    let Some(error) = error else {
        return area;
    };
    let (line, rest) = split_top(area, 1);
    let text = Line::from(vec![
        Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        Span::raw("  "),
        Span::styled(RETRY_HINT, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(text), line);
    rest
}

fn message(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'_>>) {
    frame.render_widget(Paragraph::new(lines).block(panel(title)).wrap(Wrap { trim: true }), area);
}

fn table<'a>(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    headers: &[&'a str],
    widths: &[Constraint],
    rows: Vec<Row<'a>>,
    cursor: usize,
) {
    let header = Row::new(headers.iter().copied().map(Cell::from).collect::<Vec<_>>())
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(rows, widths.to_vec())
        .header(header)
        .block(panel(title))
        .row_highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = TableState::default().with_selected(Some(cursor));
    frame.render_stateful_widget(table, area, &mut state);
}

/// Splits `area` into a few text lines on top and the rest below.
fn split_top(area: Rect, lines: u16) -> (Rect, Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(lines), Constraint::Min(0)])
        .split(area);
    (parts[0], parts[1])
}

fn popup(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn draw_login(frame: &mut Frame, app: &App, area: Rect) {
    let area = popup(area, 50, 50);
    let login = &app.login;
    let focus = |active: bool| {
        if active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    };

    let mut lines = vec![
        Line::from("Fruit Management").style(Style::default().add_modifier(Modifier::BOLD)),
        muted("Sign in to continue"),
        Line::from(""),
        Line::from(format!("Username: {}", login.username)).style(focus(!login.on_password)),
        Line::from(format!("Password: {}", "*".repeat(login.password.chars().count())))
            .style(focus(login.on_password)),
        Line::from(""),
    ];
    if app.saving {
        lines.push(muted("Signing in..."));
        lines.push(Line::from(""));
    } else if let Some(error) = &login.error {
        lines.push(notice(error));
        lines.push(Line::from(""));
    }
    lines.push(muted("Tab: switch field   Enter: sign in   Esc: quit"));

    frame.render_widget(Clear, area);
    message(frame, area, "Login", lines);
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let current = match app.route {
        Route::Dashboard(section) => Some(section),
        Route::ContactDetail(_) | Route::ContactForm(_) => Some(Section::Contacts),
        Route::Login => None,
    };
    let lines: Vec<Line> = app
        .sections()
        .into_iter()
        .enumerate()
        .map(|(i, section)| {
            let text = format!(" {} {}", i + 1, section.label());
            if Some(section) == current {
                Line::from(text).style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            } else {
                Line::from(text)
            }
        })
        .collect();
    message(frame, area, "Fruit Management", lines);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let greeting = app
        .backend()
        .session()
        .current_user()
        .map(|user| format!("Welcome, {}", user.full_name))
        .unwrap_or_default();
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let block = Block::default().borders(Borders::BOTTOM);
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(" Church Management System").style(Style::default().add_modifier(Modifier::BOLD)),
        halves[0],
    );
    frame.render_widget(Paragraph::new(format!("{} ", greeting)).alignment(Alignment::Right), halves[1]);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let keys = if app.saving {
        "Saving..."
    } else if app.confirm.is_some() {
        "y: confirm | any key: keep"
    } else if app.active_form().is_some() {
        "Tab/Shift+Tab: field | ←/→/Space: choose | Enter: save | Esc: cancel"
    } else if app.editing_notes {
        "Type notes | Enter/Esc: done"
    } else {
        match app.route {
            Route::Dashboard(Section::Contacts) => "↑/↓: select | Enter: open | n: new | ←/→: page | r: reload | q: quit",
            Route::ContactDetail(_) => "←/→: status | i: notes | s: save status | e: edit | d: delete | b: back",
            Route::Dashboard(Section::Studies) => "←/→: contact | n: new | e: edit | d: delete | r: reload | q: quit",
            Route::Dashboard(Section::Reservations) => {
                "←/→: day | t: today | f: room | n: book | d: cancel | r: reload | q: quit"
            }
            Route::Dashboard(Section::Admin) => "←/→: tab | n: add | e: edit | d: delete | r: reload | q: quit",
            _ => "Tab: next section | r: reload | L: logout | q: quit",
        }
    };
    frame.render_widget(
        Paragraph::new(format!(" {} ", keys)).style(Style::default().bg(Color::DarkGray).fg(Color::White)),
        area,
    );
}

fn draw_screen(frame: &mut Frame, app: &App, area: Rect) {
    match app.route {
        Route::Login => {}
        Route::Dashboard(Section::Overview) => draw_overview(frame, app, area),
        Route::Dashboard(Section::Contacts) => draw_contacts(frame, app, area),
        Route::Dashboard(Section::Studies) => draw_studies(frame, app, area),
        Route::Dashboard(Section::Reservations) => draw_reservations(frame, app, area),
        Route::Dashboard(Section::Admin) => draw_admin(frame, app, area),
        Route::ContactDetail(_) => draw_detail(frame, app, area),
        Route::ContactForm(_) => draw_contact_form(frame, app, area),
    }
}

fn draw_overview(frame: &mut Frame, app: &App, area: Rect) {
    let error = app.contacts.state().error();
    if let Some(lines) = placeholder(app.contacts.current().is_some(), error) {
        return message(frame, area, "Dashboard", lines);
    }
    let area = retry_banner(frame, area, error);
    let Some(overview) = app.contacts.overview() else {
        return;
    };

    let mut lines = vec![
        Line::from(format!("Total contacts: {}", overview.total)).style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("By status"),
    ];
    if overview.by_status.is_empty() {
        lines.push(muted("No contacts yet."));
    }
    for (name, count) in &overview.by_status {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<16}", name), Style::default().fg(tone_color(format::status_tone(name)))),
            Span::raw(count.to_string()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Recently added"));
    for row in &overview.recent {
        lines.push(Line::from(format!("  {}  {}  {}", row.added, row.name, row.status)));
    }
    message(frame, area, "Dashboard", lines);
}

fn draw_contacts(frame: &mut Frame, app: &App, area: Rect) {
    let page = app.contacts.page();
    let title = format!("Contacts (page {})", page.offset / page.limit + 1);
    let error = app.contacts.state().error();
    if let Some(lines) = placeholder(app.contacts.current().is_some(), error) {
        return message(frame, area, &title, lines);
    }
    let area = retry_banner(frame, area, error);
    if let Some(empty) = app.contacts.empty_message() {
        return message(frame, area, &title, vec![muted(empty)]);
    }

    let rows = app
        .contacts
        .rows()
        .into_iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.name),
                Cell::from(r.email),
                Cell::from(r.phone),
                Cell::from(r.location),
                Cell::from(r.status).style(Style::default().fg(tone_color(r.tone))),
                Cell::from(r.added),
            ])
        })
        .collect();
    table(
        frame,
        area,
        &title,
        &["Name", "Email", "Phone", "Location", "Status", "Added"],
        &[
            Constraint::Percentage(20),
            Constraint::Percentage(22),
            Constraint::Percentage(14),
            Constraint::Percentage(16),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
        ],
        rows,
        app.cursor,
    );
}

fn draw_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(detail) = &app.detail else {
        return;
    };
    if let Some(failure) = detail.failure() {
        let lines = vec![
            notice(failure),
            Line::from(""),
            muted(RETRY_HINT),
            Line::from(format!("Press b to go {}", BACK_TO_CONTACTS)).style(Style::default().fg(Color::DarkGray)),
        ];
        return message(frame, area, "Contact", lines);
    }
    let Some(summary) = detail.summary() else {
        return message(frame, area, "Contact", vec![muted("Loading...")]);
    };
    let area = retry_banner(frame, area, detail.state().error());

    let (top, bottom) = split_top(area, 11);
    let chosen = detail
        .status_choice
        .map(|id| detail.status_name(id).to_string())
        .unwrap_or_else(|| summary.status.clone());
    let mut lines = vec![
        Line::from(vec![
            Span::styled(summary.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(summary.status.clone(), Style::default().fg(tone_color(summary.tone))),
        ]),
        Line::from(format!("Email: {}   Phone: {}", summary.email, summary.phone)),
        Line::from(format!("Location: {}   Added: {}", summary.location, summary.added)),
        Line::from(""),
        Line::from(format!("Change status: ◀ {} ▶", chosen)),
        Line::from(format!(
            "Notes: {}{}",
            detail.status_notes,
            if app.editing_notes { "_" } else { "" }
        )),
    ];
    if let Some(text) = detail.notice() {
        lines.push(notice(text));
    }
    message(frame, top, "Contact", lines);

    if let Some(empty) = detail.history_empty_message() {
        return message(frame, bottom, "Status History", vec![muted(empty)]);
    }
    let rows = detail
        .history()
        .into_iter()
        .map(|h| Row::new(vec![h.changed, h.status, h.notes.unwrap_or_default()]))
        .collect();
    table(
        frame,
        bottom,
        "Status History",
        &["Changed", "Status", "Notes"],
        &[Constraint::Length(18), Constraint::Length(16), Constraint::Min(10)],
        rows,
        0,
    );
}

fn draw_contact_form(frame: &mut Frame, app: &App, area: Rect) {
    let Some(form) = &app.contact_form else {
        return;
    };
    if form.is_loading() {
        return message(frame, area, &form.title(), vec![muted("Loading...")]);
    }
    draw_form(frame, form, app.field, area);
}

fn draw_form(frame: &mut Frame, form: &dyn EditableForm, focused: usize, area: Rect) {
    let mut lines = Vec::new();
    for (i, field) in form.fields().iter().enumerate() {
        let value = form.value(field.key);
        let shown = match field.kind {
            FieldKind::Toggle => {
                if crate::forms::flag(&value) {
                    "[x]".to_string()
                } else {
                    "[ ]".to_string()
                }
            }
            FieldKind::Choice => form
                .choices(field.key)
                .into_iter()
                .find(|(v, _)| *v == value)
                .map(|(_, label)| format!("◀ {} ▶", label))
                .unwrap_or_else(|| "◀ Select ▶".to_string()),
            _ if i == focused => format!("{}_", value),
            _ => value,
        };
        let label = format!("{}{}: ", field.label, if field.required { " *" } else { "" });
        let style = if i == focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![Span::styled(label, style), Span::raw(shown)]));
    }
    if let Some(error) = form.error() {
        lines.push(Line::from(""));
        lines.push(notice(error));
    }

    frame.render_widget(Clear, area);
    message(frame, area, &form.title(), lines);
}

fn draw_studies(frame: &mut Frame, app: &App, area: Rect) {
    let studies = &app.studies;
    let reference = studies.reference();
    if let Some(lines) = placeholder(reference.value().is_some(), reference.error()) {
        return message(frame, area, "Bible Studies", lines);
    }
    let area = retry_banner(frame, area, reference.error());
    let Some(contact) = studies.selected_contact() else {
        let empty = studies.empty_message().unwrap_or_default();
        return message(frame, area, "Bible Studies", vec![muted(empty)]);
    };

    let (top, bottom) = split_top(area, 5);
    let mut lines = vec![Line::from(format!("Contact: ◀ {} ▶", contact.name))];
    match studies.stats() {
        Some(stats) => lines.push(Line::from(format!(
            "Completed: {}   Progress: {}   Last study: {}   Total time: {}",
            stats.completed, stats.progress, stats.last_study, stats.total_time
        ))),
        None => lines.push(muted("")),
    }
    if let Some(text) = studies.notice() {
        lines.push(notice(text));
    }
    message(frame, top, "Bible Studies", lines);

    let error = studies.studies().error();
    if let Some(lines) = placeholder(studies.current().is_some(), error) {
        return message(frame, bottom, "Studies", lines);
    }
    let bottom = retry_banner(frame, bottom, error);
    if let Some(empty) = studies.empty_message() {
        return message(frame, bottom, "Studies", vec![muted(empty)]);
    }
    let rows = studies
        .rows()
        .into_iter()
        .map(|r| Row::new(vec![r.lesson, r.date, r.duration, r.location]))
        .collect();
    table(
        frame,
        bottom,
        "Studies",
        &["Lesson", "Date", "Duration", "Location"],
        &[
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(15),
            Constraint::Percentage(25),
        ],
        rows,
        app.cursor,
    );
}

fn draw_reservations(frame: &mut Frame, app: &App, area: Rect) {
    let reservations = &app.reservations;
    let (top, bottom) = split_top(area, 5);

    let filter = match reservations.room_filter() {
        Some(id) => reservations
            .rooms()
            .value()
            .and_then(|rooms| crate::dashboard::lookup(rooms, id))
            .map(|room| room.name.clone())
            .unwrap_or_else(|| crate::dashboard::UNKNOWN_ROOM.to_string()),
        None => "All rooms".to_string(),
    };
    let mut lines = vec![
        Line::from(reservations.heading()).style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(format!("Room filter: {}", filter)),
    ];
    if let Some(error) = reservations.rooms().error() {
        lines.push(notice(error));
    } else if let Some(text) = reservations.notice() {
        lines.push(notice(text));
    }
    message(frame, top, "Room Reservations", lines);

    let error = reservations.reservations().error();
    if let Some(lines) = placeholder(reservations.current().is_some(), error) {
        return message(frame, bottom, "Reservations", lines);
    }
    let bottom = retry_banner(frame, bottom, error);
    if let Some(empty) = reservations.empty_message() {
        return message(frame, bottom, "Reservations", vec![muted(empty)]);
    }
    let rows = reservations
        .rows()
        .into_iter()
        .map(|r| Row::new(vec![r.time, r.room, r.title, r.description]))
        .collect();
    table(
        frame,
        bottom,
        "Reservations",
        &["Time", "Room", "Title", "Description"],
        &[
            Constraint::Length(16),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
            Constraint::Min(10),
        ],
        rows,
        app.cursor,
    );
}

fn draw_admin(frame: &mut Frame, app: &App, area: Rect) {
    let admin = &app.admin;
    let (top, bottom) = split_top(area, 4);

    let selected = AdminTab::ALL.iter().position(|t| *t == admin.tab()).unwrap_or(0);
    let tabs = Tabs::new(AdminTab::ALL.iter().map(|t| t.label()).collect::<Vec<_>>())
        .select(selected)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(panel("Admin Dashboard"));
    frame.render_widget(tabs, top);

    let title = admin.tab().label();
    let error = admin.load_error();
    if let Some(lines) = placeholder(admin.has_data(), error) {
        return message(frame, bottom, title, lines);
    }
    let bottom = retry_banner(frame, bottom, error);
    if let Some(empty) = admin.empty_message() {
        let mut lines = vec![muted(empty)];
        if let Some(text) = admin.notice() {
            lines.push(notice(text));
        }
        return message(frame, bottom, title, lines);
    }

    let list_area = match admin.notice() {
        Some(text) => {
            let (line, rest) = split_top(bottom, 1);
            frame.render_widget(Paragraph::new(notice(text)), line);
            rest
        }
        None => bottom,
    };

    match admin.tab() {
        AdminTab::Rooms => {
            let rows = admin
                .rooms()
                .value()
                .map(|rooms| {
                    rooms
                        .iter()
                        .map(|r| {
                            let hours = match (&r.availability_start, &r.availability_end) {
                                (Some(start), Some(end)) => format!("{} - {}", start, end),
                                _ => format::DASH.to_string(),
                            };
                            Row::new(vec![
                                r.name.clone(),
                                r.capacity.to_string(),
                                format::or_dash(r.location.as_deref()),
                                hours,
                                if r.is_available { "Available" } else { "Unavailable" }.to_string(),
                            ])
                        })
                        .collect()
                })
                .unwrap_or_default();
            table(
                frame,
                list_area,
                title,
                &["Name", "Capacity", "Location", "Hours", "Status"],
                &[
                    Constraint::Percentage(25),
                    Constraint::Length(10),
                    Constraint::Percentage(25),
                    Constraint::Length(22),
                    Constraint::Min(11),
                ],
                rows,
                app.cursor,
            );
        }
        AdminTab::Users => {
            let rows = admin
                .users()
                .value()
                .map(|users| {
                    users
                        .iter()
                        .map(|u| {
                            Row::new(vec![
                                u.username.clone(),
                                u.full_name.clone(),
                                u.email.clone(),
                                if u.is_admin() { "admin" } else { "user" }.to_string(),
                            ])
                        })
                        .collect()
                })
                .unwrap_or_default();
            table(
                frame,
                list_area,
                title,
                &["Username", "Name", "Email", "Role"],
                &[
                    Constraint::Percentage(20),
                    Constraint::Percentage(30),
                    Constraint::Percentage(35),
                    Constraint::Percentage(15),
                ],
                rows,
                app.cursor,
            );
        }
        AdminTab::Lessons => {
            let rows = admin
                .lessons()
                .value()
                .map(|lessons| {
                    lessons
                        .iter()
                        .map(|l| {
                            Row::new(vec![
                                l.sequence_number.to_string(),
                                l.title.clone(),
                                format::or_dash(l.description.as_deref()),
                            ])
                        })
                        .collect()
                })
                .unwrap_or_default();
            table(
                frame,
                list_area,
                title,
                &["#", "Title", "Description"],
                &[Constraint::Length(4), Constraint::Percentage(35), Constraint::Min(10)],
                rows,
                app.cursor,
            );
        }
    }
}
