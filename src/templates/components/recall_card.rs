use crate::domain::recall::StoredRecall;
use maud::{html, Markup};

/// Listing card for one recall; `pending` marks an edit awaiting review.
pub fn recall_card(recall: &StoredRecall, pending: bool) -> Markup {
    let href = format!("/recalls/{}/{}", recall.source, recall.id);

    html! {
        article class="recall-card" {
            @if let Some(img) = recall.primary_image() {
                @if let Some(url) = &img.url {
                    img src=(url) alt=(recall.display_title()) loading="lazy";
                }
            }
            div class="recall-card-body" {
                span class={"badge source-" (recall.source.as_str().to_lowercase())} { (recall.source) }
                @if pending {
                    span class="badge pending" { "Edit pending" }
                }
                h3 { a href=(href) { (recall.display_title()) } }
                @if let Some(date) = recall.recall_date {
                    p class="muted" { (date.format("%b %-d, %Y")) }
                }
                @if let Some(class) = recall.snapshot.classification() {
                    p class="muted" { (class) }
                }
                p class="states" { (recall.affected_states.join(", ")) }
            }
        }
    }
}
