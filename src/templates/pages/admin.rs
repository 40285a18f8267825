use crate::db::ingest_runs::IngestRun;
use crate::db::pending_changes::ResolvedRow;
use crate::db::users::Actor;
use crate::domain::pending::PendingChange;
use crate::templates::desktop_layout;
use maud::{html, Markup};

pub struct AdminVm<'a> {
    pub actor: &'a Actor,
    pub pending: Vec<PendingChange>,
    pub resolved: Vec<ResolvedRow>,
    pub ingest_runs: Vec<IngestRun>,
    pub flash: Option<String>,
}

pub fn admin_page(vm: &AdminVm) -> Markup {
    desktop_layout(
        "Review queue",
        Some(vm.actor),
        html! {
            h1 { "Review queue" }

            @if let Some(flash) = &vm.flash {
                div class="flash" { (flash) }
            }

            div class="card" style="margin-bottom: 2rem;" {
                h3 { "Pending changes (" (vm.pending.len()) ")" }
                @if vm.pending.is_empty() {
                    p class="muted" { "Nothing waiting for review." }
                } @else {
                    div style="overflow-x: auto;" {
                        table style="width: 100%; border-collapse: collapse; margin-top: 1rem;" {
                            thead {
                                tr {
                                    th style="padding: 12px 8px; border-bottom: 2px solid #e5e7eb; text-align: left;" { "Recall" }
                                    th style="padding: 12px 8px; border-bottom: 2px solid #e5e7eb; text-align: left;" { "Current title" }
                                    th style="padding: 12px 8px; border-bottom: 2px solid #e5e7eb; text-align: left;" { "Proposed title" }
                                    th style="padding: 12px 8px; border-bottom: 2px solid #e5e7eb; text-align: left;" { "Images" }
                                    th style="padding: 12px 8px; border-bottom: 2px solid #e5e7eb; text-align: left;" { "Proposed by" }
                                    th style="padding: 12px 8px; border-bottom: 2px solid #e5e7eb; text-align: left;" { "Actions" }
                                }
                            }
                            tbody {
                                @for change in &vm.pending {
                                    tr {
                                        td style="padding: 8px; border-bottom: 1px solid #f3f4f6;" {
                                            a href=(format!("/recalls/{}/{}", change.recall_source, change.recall_id)) {
                                                (change.recall_source) " " (change.recall_id)
                                            }
                                        }
                                        td style="padding: 8px; border-bottom: 1px solid #f3f4f6;" { (change.original_recall.title()) }
                                        td style="padding: 8px; border-bottom: 1px solid #f3f4f6;" {
                                            (change.proposed_display.preview_title.as_deref().unwrap_or("—"))
                                        }
                                        td style="padding: 8px; border-bottom: 1px solid #f3f4f6;" { (change.proposed_display.uploaded_images.len()) }
                                        td style="padding: 8px; border-bottom: 1px solid #f3f4f6; color: #6b7280; font-size: 0.9em;" {
                                            (change.proposed_by.username) br;
                                            (change.proposed_at.format("%Y-%m-%d %H:%M"))
                                        }
                                        td style="padding: 8px; border-bottom: 1px solid #f3f4f6;" {
                                            form action=(format!("/admin/pending/{}/approve", change.id)) method="post" style="display: inline; margin: 0;" {
                                                button type="submit" style="padding: 4px 8px; background: #10b981; color: white; border: none; border-radius: 4px; cursor: pointer;" { "Approve" }
                                            }
                                            form action=(format!("/admin/pending/{}/reject", change.id)) method="post" style="display: inline-flex; gap: 4px; margin: 0 0 0 8px;" {
                                                input type="text" name="reason" placeholder="Reason (optional)" style="padding: 4px; border: 1px solid #ccc; border-radius: 4px;";
                                                button type="submit" style="padding: 4px 8px; background: #dc2626; color: white; border: none; border-radius: 4px; cursor: pointer;" { "Reject" }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            div class="card" style="margin-bottom: 2rem;" {
                h3 { "Recently resolved" }
                table style="width: 100%; border-collapse: collapse; font-size: 0.9em;" {
                    tbody {
                        @for row in &vm.resolved {
                            tr {
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (row.recall_source) " " (row.recall_id) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (row.resolution) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (row.resolved_by) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (row.resolved_at.format("%Y-%m-%d %H:%M")) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9; color: #666;" { (row.reason.as_deref().unwrap_or("")) }
                            }
                        }
                    }
                }
            }

            div class="card" style="margin-bottom: 2rem;" {
                h3 { "Feed ingestion" }
                form action="/admin/ingest" method="post" style="display: flex; gap: 10px; align-items: center; margin-bottom: 1rem;" {
                    select name="source" required style="padding: 8px; border-radius: 4px; border: 1px solid #ccc;" {
                        option value="USDA" { "USDA FSIS" }
                        option value="FDA" { "openFDA enforcement" }
                    }
                    button type="submit" style="padding: 8px 16px; background: #10b981; color: white; border: none; border-radius: 4px; cursor: pointer;" { "Start ingest" }
                }

                h4 { "Recent runs" }
                table style="width: 100%; border-collapse: collapse; font-size: 0.9em;" {
                    thead {
                        tr {
                            th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "ID" }
                            th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Source" }
                            th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Started" }
                            th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Status" }
                            th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Seen" }
                            th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Stored" }
                        }
                    }
                    tbody {
                        @for run in &vm.ingest_runs {
                            tr {
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.id) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.source) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.started_at) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" {
                                    @if run.finished_at.is_none() {
                                        span style="color: blue;" { "Running..." }
                                    } @else if run.success {
                                        span style="color: green;" { "Success" }
                                    } @else {
                                        span style="color: red;" { "Failed" }
                                        @if let Some(err) = &run.error_message {
                                            br; span style="font-size: 0.8em; color: #666;" { (err) }
                                        }
                                    }
                                }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.records_seen.unwrap_or(0)) }
                                td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.records_stored.unwrap_or(0)) }
                            }
                        }
                    }
                }
            }

            div class="card" {
                h3 { "Email digest" }
                form action="/admin/digest" method="post" style="margin: 0;" {
                    button type="submit" style="padding: 8px 16px; background: #3b82f6; color: white; border: none; border-radius: 4px; cursor: pointer;" { "Send digest now" }
                }
            }
        },
    )
}
