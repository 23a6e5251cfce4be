//! Non-interactive subcommands. Each one drives the same view model as the
//! matching dashboard screen and renders it as a plain text table.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use shared::Timestamp;

use crate::api::Backend;
use crate::auth::NOT_LOGGED_IN;
use crate::dashboard::admin::{AdminDashboard, AdminTab};
use crate::dashboard::contact_detail::ContactDetail;
use crate::dashboard::contacts::ContactsDashboard;
use crate::dashboard::reservations::{ReservationsDashboard, CANCEL_FAILED, CREATE_FAILED};
use crate::dashboard::studies::StudiesDashboard;
use crate::dashboard::describe_failure;
use crate::forms::EditableForm;
use crate::format;

/// Fail early when there is no stored session to send.
pub fn require_login(backend: &Backend) -> Result<()> {
    if !backend.session().init() {
        bail!(NOT_LOGGED_IN);
    }
    Ok(())
}

pub async fn contacts(backend: &Backend, page_size: u32) -> Result<String> {
    let mut dashboard = ContactsDashboard::new(page_size);
    dashboard.refresh(backend).await;
    if let Some(error) = dashboard.state().error() {
        bail!(error.to_string());
    }
    if let Some(empty) = dashboard.empty_message() {
        return Ok(empty.to_string());
    }

    let rows = dashboard
        .rows()
        .into_iter()
        .map(|r| vec![r.id.to_string(), r.name, r.email, r.phone, r.location, r.status, r.added])
        .collect();
    Ok(table(&["ID", "NAME", "EMAIL", "PHONE", "LOCATION", "STATUS", "ADDED"], rows))
}

pub async fn contact(backend: &Backend, contact_id: i64) -> Result<String> {
    let mut detail = ContactDetail::new(contact_id);
    detail.refresh(backend).await;
    if let Some(failure) = detail.failure() {
        bail!(failure.to_string());
    }
    let Some(summary) = detail.summary() else {
        bail!(crate::dashboard::contact_detail::LOAD_FAILED);
    };

    let mut out = format!(
        "{}\nStatus:   {}\nEmail:    {}\nPhone:    {}\nLocation: {}\nAdded:    {}\n",
        summary.name, summary.status, summary.email, summary.phone, summary.location, summary.added
    );
    if let Some(notes) = detail
        .state()
        .value()
        .and_then(|v| v.contact.notes.as_deref())
        .filter(|n| !n.trim().is_empty())
    {
        out.push_str(&format!("Notes:    {}\n", notes));
    }

    out.push_str("\nStatus history\n");
    match detail.history_empty_message() {
        Some(empty) => out.push_str(empty),
        None => {
            let rows = detail
                .history()
                .into_iter()
                .map(|h| vec![h.changed, h.status, h.notes.unwrap_or_default()])
                .collect();
            out.push_str(&table(&["CHANGED", "STATUS", "NOTES"], rows));
        }
    }
    Ok(out)
}

pub async fn set_status(backend: &Backend, contact_id: i64, status_id: i64, notes: Option<String>) -> Result<String> {
    let mut detail = ContactDetail::new(contact_id);
    detail.status_choice = Some(status_id);
    detail.status_notes = notes.unwrap_or_default();

    if !detail.update_status(backend).await {
        bail!(detail.notice().unwrap_or(crate::dashboard::contact_detail::STATUS_FAILED).to_string());
    }
    Ok(format!("Status of contact {} changed to {}", contact_id, detail.status_name(status_id)))
}

pub async fn statuses(backend: &Backend) -> Result<String> {
    let statuses = backend
        .core
        .list_statuses()
        .await
        .map_err(|e| anyhow::anyhow!(describe_failure(&e, "Failed to load statuses.")))?
        .statuses;
    let rows = statuses
        .into_iter()
        .map(|s| vec![s.id.to_string(), s.name, format::or_dash(s.description.as_deref())])
        .collect();
    Ok(table(&["ID", "NAME", "DESCRIPTION"], rows))
}

pub async fn studies(backend: &Backend, page_size: u32, contact_id: Option<i64>) -> Result<String> {
    let mut dashboard = StudiesDashboard::new(page_size);
    let (ticket, size) = dashboard.begin_reference();
    let reference = StudiesDashboard::fetch_reference(backend, size).await;
    dashboard.finish_reference(ticket, reference);
    if let Some(error) = dashboard.reference().error() {
        bail!(error.to_string());
    }
    if let Some(id) = contact_id {
        dashboard.select_contact(id);
    }
    dashboard.refresh_studies(backend).await;

    let Some(selected) = dashboard.selected() else {
        return Ok(dashboard.empty_message().unwrap_or_default().to_string());
    };
    if let Some(error) = dashboard.studies().error() {
        bail!(error.to_string());
    }

    let mut out = format!("Studies for {}\n", dashboard.contact_name(selected));
    if let Some(stats) = dashboard.stats() {
        out.push_str(&format!(
            "Completed: {}  Progress: {}  Last study: {}  Total time: {}\n\n",
            stats.completed, stats.progress, stats.last_study, stats.total_time
        ));
    }
    match dashboard.empty_message() {
        Some(empty) => out.push_str(empty),
        None => {
            let rows = dashboard
                .rows()
                .into_iter()
                .map(|r| vec![r.id.to_string(), r.lesson, r.date, r.duration, r.location])
                .collect();
            out.push_str(&table(&["ID", "LESSON", "DATE", "DURATION", "LOCATION"], rows));
        }
    }
    Ok(out)
}

async fn admin_tab(backend: &Backend, tab: AdminTab) -> Result<AdminDashboard> {
    let mut admin = AdminDashboard::new();
    admin.set_tab(tab);
    admin.refresh(backend).await;
    if let Some(error) = admin.load_error() {
        bail!(error.to_string());
    }
    Ok(admin)
}

pub async fn lessons(backend: &Backend) -> Result<String> {
    let admin = admin_tab(backend, AdminTab::Lessons).await?;
    if let Some(empty) = admin.empty_message() {
        return Ok(empty.to_string());
    }
    let rows = admin
        .lessons()
        .value()
        .map(|lessons| {
            lessons
                .iter()
                .map(|l| {
                    vec![
                        l.sequence_number.to_string(),
                        l.id.to_string(),
                        l.title.clone(),
                        format::or_dash(l.description.as_deref()),
                    ]
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(table(&["#", "ID", "TITLE", "DESCRIPTION"], rows))
}

pub async fn users(backend: &Backend) -> Result<String> {
    let admin = admin_tab(backend, AdminTab::Users).await?;
    if let Some(empty) = admin.empty_message() {
        return Ok(empty.to_string());
    }
    let rows = admin
        .users()
        .value()
        .map(|users| {
            users
                .iter()
                .map(|u| {
                    vec![
                        u.id.to_string(),
                        u.username.clone(),
                        u.full_name.clone(),
                        u.email.clone(),
                        if u.is_admin() { "admin" } else { "user" }.to_string(),
                    ]
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(table(&["ID", "USERNAME", "NAME", "EMAIL", "ROLE"], rows))
}

/// Filters for `rooms --available`.
#[derive(Debug, Clone)]
pub struct Availability {
    pub start: String,
    pub end: String,
    pub capacity: Option<i64>,
}

pub async fn rooms(backend: &Backend, available: Option<Availability>) -> Result<String> {
    let rooms = match available {
        None => {
            let mut dashboard = ReservationsDashboard::new(today());
            let ticket = dashboard.begin_rooms();
            let result = ReservationsDashboard::fetch_rooms(backend).await;
            dashboard.finish_rooms(ticket, result);
            if let Some(error) = dashboard.rooms().error() {
                bail!(error.to_string());
            }
            dashboard.rooms().value().cloned().unwrap_or_default()
        }
        Some(filter) => {
            let start: Timestamp = filter.start.parse().context("--start must be a date or RFC 3339 time")?;
            let end: Timestamp = filter.end.parse().context("--end must be a date or RFC 3339 time")?;
            if end <= start {
                bail!("--end must be after --start");
            }
            backend
                .rooms
                .available_rooms(start, end, filter.capacity)
                .await
                .map_err(|e| anyhow::anyhow!(describe_failure(&e, "Failed to check room availability.")))?
                .rooms
        }
    };

    if rooms.is_empty() {
        return Ok(AdminTab::Rooms.empty_message().to_string());
    }
    let rows = rooms
        .into_iter()
        .map(|r| {
            let hours = match (&r.availability_start, &r.availability_end) {
                (Some(start), Some(end)) => format!("{}-{}", start, end),
                _ => format::DASH.to_string(),
            };
            vec![
                r.id.to_string(),
                r.name,
                r.capacity.to_string(),
                format::or_dash(r.location.as_deref()),
                hours,
                if r.is_available { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    Ok(table(&["ID", "NAME", "CAPACITY", "LOCATION", "HOURS", "BOOKABLE"], rows))
}

pub async fn reservations(backend: &Backend, date: Option<NaiveDate>, room_id: Option<i64>) -> Result<String> {
    let mut dashboard = ReservationsDashboard::new(date.unwrap_or_else(today));
    dashboard.set_room_filter(room_id);
    dashboard.refresh(backend).await;
    if let Some(error) = dashboard.reservations().error() {
        bail!(error.to_string());
    }

    let mut out = format!("{}\n", dashboard.heading());
    match dashboard.empty_message() {
        Some(empty) => out.push_str(empty),
        None => {
            let rows = dashboard
                .rows()
                .into_iter()
                .map(|r| vec![r.id.to_string(), r.time, r.room, r.title, r.description])
                .collect();
            out.push_str(&table(&["ID", "TIME", "ROOM", "TITLE", "DESCRIPTION"], rows));
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub room_id: i64,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub start: String,
    pub end: String,
    pub description: Option<String>,
}

pub async fn book(backend: &Backend, booking: Booking) -> Result<String> {
    let mut dashboard = ReservationsDashboard::new(booking.date.unwrap_or_else(today));
    let ticket = dashboard.begin_rooms();
    let result = ReservationsDashboard::fetch_rooms(backend).await;
    dashboard.finish_rooms(ticket, result);

    dashboard.toggle_form();
    let Some(form) = dashboard.form_mut() else {
        bail!("Could not open the booking form");
    };
    form.set_value("room_id", booking.room_id.to_string());
    form.set_value("title", booking.title);
    form.set_value("start_time", booking.start);
    form.set_value("end_time", booking.end);
    form.set_value("description", booking.description.unwrap_or_default());

    if !dashboard.submit_form(backend).await {
        let message = dashboard.form().and_then(|f| f.error()).unwrap_or(CREATE_FAILED);
        bail!(message.to_string());
    }
    Ok(format!("Room booked for {}", dashboard.date().format("%Y-%m-%d")))
}

pub async fn cancel(backend: &Backend, reservation_id: i64) -> Result<String> {
    backend
        .rooms
        .delete_reservation(reservation_id)
        .await
        .map_err(|e| anyhow::anyhow!(describe_failure(&e, CANCEL_FAILED)))?;
    tracing::info!(reservation_id, "Cancelled reservation");
    Ok(format!("Reservation {} cancelled", reservation_id))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Left-aligned columns separated by two spaces.
fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = line(headers.to_vec());
    for row in &rows {
        out.push('\n');
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}
