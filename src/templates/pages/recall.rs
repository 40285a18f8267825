// templates/pages/recall.rs

use crate::db::users::Actor;
use crate::domain::pending::PendingChange;
use crate::domain::recall::{RecallSnapshot, StoredRecall};
use crate::templates::{card, desktop_layout};
use maud::{html, Markup};

pub struct RecallVm<'a> {
    pub actor: Option<&'a Actor>,
    pub recall: StoredRecall,
    pub pending: Vec<PendingChange>,
}

fn field(label: &str, value: Option<&str>) -> Markup {
    html! {
        @if let Some(value) = value {
            dt { (label) }
            dd { (value) }
        }
    }
}

fn snapshot_fields(snapshot: &RecallSnapshot) -> Markup {
    match snapshot {
        RecallSnapshot::Usda(r) => html! {
            (field("Recall number", Some(r.recall_number.as_str())))
            (field("Type", r.recall_type.as_deref()))
            (field("Classification", r.recall_classification.as_deref()))
            (field("Reason", r.recall_reason.as_deref()))
            (field("Risk level", r.risk_level.as_deref()))
            (field("Establishment", r.establishment.as_deref()))
            (field("Distribution", r.states.as_deref()))
            (field("Products", r.product_items.as_deref()))
        },
        RecallSnapshot::Fda(r) => html! {
            (field("Recall number", Some(r.recall_number.as_str())))
            (field("Status", r.status.as_deref()))
            (field("Classification", r.classification.as_deref()))
            (field("Reason", r.reason_for_recall.as_deref()))
            (field("Firm", r.recalling_firm.as_deref()))
            (field("Distribution", r.distribution_pattern.as_deref()))
            (field("Quantity", r.product_quantity.as_deref()))
        },
        RecallSnapshot::TempFda(r) => html! {
            (field("Company", r.company.as_deref()))
            (field("Product", r.product.as_deref()))
            (field("Reason", r.reason.as_deref()))
            (field("Distribution", r.distribution_pattern.as_deref()))
            (field("Announcement", r.url.as_deref()))
        },
    }
}

pub fn recall_page(vm: &RecallVm) -> Markup {
    let recall = &vm.recall;
    let pending_note = format!("{} awaiting review", vm.pending.len());

    desktop_layout(
        recall.display_title(),
        vm.actor,
        html! {
            h1 { (recall.display_title()) }
            @if recall.display_title() != recall.title {
                p class="muted" { "Feed title: " (recall.title) }
            }

            @if let Some(display) = &recall.display {
                div class="gallery" {
                    @for img in &display.display.uploaded_images {
                        @if let Some(url) = &img.url {
                            img src=(url) alt=(img.filename);
                        }
                    }
                }
            }

            (card("Details", Some(recall.source.as_str()), html! {
                dl {
                    (field("Source", Some(recall.source.as_str())))
                    @if let Some(date) = recall.recall_date {
                        dt { "Date" }
                        dd { (date.format("%B %-d, %Y")) }
                    }
                    (snapshot_fields(&recall.snapshot))
                    dt { "Affected states" }
                    dd { (recall.affected_states.join(", ")) }
                }
            }))

            @if !vm.pending.is_empty() {
                (card("Pending edits", Some(pending_note.as_str()), html! {
                    ul {
                        @for change in &vm.pending {
                            li {
                                (change.proposed_by.username) " proposed "
                                em { (change.proposed_display.preview_title.as_deref().unwrap_or("(no title change)")) }
                                " on " (change.proposed_at.format("%Y-%m-%d %H:%M UTC"))
                            }
                        }
                    }
                }))
            }
        },
    )
}
