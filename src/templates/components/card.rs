use maud::{html, Markup};

/// Titled panel; `note` renders muted beside the title (counts, sources).
pub fn card(title: &str, note: Option<&str>, body: Markup) -> Markup {
    html! {
        section class="card" {
            header class="card-header" {
                h2 { (title) }
                @if let Some(note) = note {
                    span class="muted" { (note) }
                }
            }
            div class="card-body" {
                (body)
            }
        }
    }
}
