// templates/pages/home.rs

use crate::db::users::Actor;
use crate::domain::recall::{recall_key, RecallSource, StoredRecall};
use crate::geos::US_STATES;
use crate::templates::{desktop_layout, recall_card};
use maud::{html, Markup};
use std::collections::HashSet;

pub struct HomeVm<'a> {
    pub actor: Option<&'a Actor>,
    pub recalls: Vec<StoredRecall>,
    pub pending_keys: HashSet<String>,
    pub state: Option<String>,
    pub source: Option<RecallSource>,
}

impl HomeVm<'_> {
    fn export_href(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(state) = &self.state {
            query.append_pair("state", state);
        }
        if let Some(source) = self.source {
            query.append_pair("source", source.as_str());
        }
        format!("/api/recalls/export.xlsx?{}", query.finish())
    }
}

pub fn home_page(vm: &HomeVm) -> Markup {
    let selected_state = vm.state.as_deref().unwrap_or("");

    desktop_layout(
        "Recalls",
        vm.actor,
        html! {
            h1 { "Food recalls" }

            form method="get" action="/" class="filters" {
                select name="state" {
                    option value="" selected[selected_state.is_empty()] { "All states" }
                    @for (_, name) in US_STATES {
                        option value=(name) selected[selected_state == name] { (name) }
                    }
                }
                select name="source" {
                    option value="" selected[vm.source.is_none()] { "All sources" }
                    @for source in RecallSource::ALL {
                        option value=(source.as_str()) selected[vm.source == Some(source)] { (source) }
                    }
                }
                button type="submit" { "Filter" }
                a href=(vm.export_href()) class="btn" { "Download XLSX" }
            }

            @if vm.recalls.is_empty() {
                p class="muted" { "No recalls match these filters." }
            } @else {
                p class="muted" { (vm.recalls.len()) " recalls" }
                div class="recall-grid" {
                    @for recall in &vm.recalls {
                        (recall_card(recall, vm.pending_keys.contains(&recall_key(&recall.id, recall.source))))
                    }
                }
            }
        },
    )
}
