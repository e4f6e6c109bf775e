//! Plain-text rendering of controller state for the terminal.

use std::fmt::Write as _;

use client_core::{CollectionState, ListView};
use shared::domain::Company;

pub fn render_list(state: &CollectionState) -> String {
    let view = state.view();
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.heading());

    match &view {
        ListView::Loading => out.push_str("Loading companies...\n"),
        ListView::Error(message) => {
            let _ = writeln!(out, "Error: {message}");
            out.push_str("Run `list` again to retry.\n");
        }
        ListView::Empty => {
            out.push_str("No companies found\n");
            out.push_str("Get started by adding your first company with `add`.\n");
        }
        ListView::Populated(records) => {
            for company in records {
                let busy = if state.is_deleting(company.id) {
                    " (deleting...)"
                } else {
                    ""
                };
                let _ = writeln!(out, "{}{busy}", render_company(company));
            }
        }
    }

    if let Some(message) = state.delete_error() {
        let _ = writeln!(out, "Error: {message}");
    }
    out
}

pub fn render_company(company: &Company) -> String {
    format!(
        "[{}] {} - {}",
        company.id, company.name, company.location
    )
}
