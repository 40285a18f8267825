use crate::db::users::Actor;
use maud::{html, Markup, DOCTYPE};

pub fn desktop_layout(title: &str, actor: Option<&Actor>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " · Recall Watch" }
                link rel="icon" href="/static/favicon/favicon.ico";
                link rel="stylesheet" href="/static/main.css";
                script src="/static/htmx.js" defer {};
            }
            body {
                header class="flex items-center justify-between px-6 py-3 shadow" {
                    svg
                        xmlns="http://www.w3.org/2000/svg"
                        width="24"
                        height="24"
                        viewBox="0 0 24 24"
                        fill="none"
                        stroke="#d2524e"
                        stroke-width="2"
                        stroke-linecap="round"
                        stroke-linejoin="round"
                        class="icon icon-tabler icon-tabler-alert-triangle"
                    {
                        path stroke="none" d="M0 0h24v24H0z" fill="none" {}
                        path d="M12 9v4" {}
                        path d="M10.363 3.591l-8.106 13.534a1.914 1.914 0 0 0 1.636 2.871h16.214a1.914 1.914 0 0 0 1.636 -2.87l-8.106 -13.536a1.914 1.914 0 0 0 -3.274 0z" {}
                        path d="M12 16h.01" {}
                    }
                    h3 { "Recall Watch" }
                    nav {
                        ul {
                            li { a href="/" { "Recalls" } }
                            @if actor.is_some_and(Actor::is_admin) {
                                li { a href="/admin" { "Review queue" } }
                            }
                        }
                    }
                    @if let Some(actor) = actor {
                        span class="text-base font-medium" { (actor.user.username) }
                    }
                }
                main class="container" {
                    (content)
                }
            }
        }
    }
}
