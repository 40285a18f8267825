use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::db::recalls::{list_recalls, RecallFilter};
use crate::domain::recall::{RecallSource, StoredRecall};
use crate::errors::ServerError;
use crate::mailer::{BrevoMailer, MailerError};
use chrono::{DateTime, Duration, Utc};
use maud::{html, Markup, DOCTYPE};

/// Recalls grouped per source, in `RecallSource::ALL` order.
pub fn group_by_source(recalls: &[StoredRecall]) -> Vec<(RecallSource, Vec<&StoredRecall>)> {
    RecallSource::ALL
        .iter()
        .map(|source| {
            let group: Vec<&StoredRecall> =
                recalls.iter().filter(|r| r.source == *source).collect();
            (*source, group)
        })
        .filter(|(_, group)| !group.is_empty())
        .collect()
}

pub fn digest_subject(count: usize, days: i64) -> String {
    match count {
        1 => format!("1 food recall updated in the last {days} days"),
        n => format!("{n} food recalls updated in the last {days} days"),
    }
}

pub fn digest_html(recalls: &[StoredRecall], days: i64, base_url: &str) -> Markup {
    html! {
        (DOCTYPE)
        html {
            body style="font-family: Arial, sans-serif; line-height: 1.5; color: #333;" {
                div style="max-width: 640px; margin: 0 auto; padding: 20px;" {
                    h2 { "Recall digest" }
                    p { (digest_subject(recalls.len(), days)) "." }
                    @if recalls.is_empty() {
                        p style="color: #666;" { "Nothing new this time." }
                    }
                    @for (source, group) in group_by_source(recalls) {
                        h3 style="border-bottom: 1px solid #eee; padding-bottom: 4px;" { (source) }
                        ul style="padding-left: 1.2em;" {
                            @for recall in group {
                                li style="margin-bottom: 8px;" {
                                    a href=(format!("{base_url}/recalls/{}/{}", recall.source, recall.id)) style="color: #007bff;" {
                                        (recall.display_title())
                                    }
                                    @if let Some(date) = recall.recall_date {
                                        " (" (date.format("%b %-d, %Y")) ")"
                                    }
                                    br;
                                    span style="font-size: 0.9em; color: #666;" {
                                        (recall.affected_states.join(", "))
                                    }
                                }
                            }
                        }
                    }
                    hr style="margin-top: 30px; border: none; border-top: 1px solid #eee;";
                    p style="font-size: 0.8em; color: #999;" {
                        "You are receiving this because your address is on the recall digest list."
                    }
                }
            }
        }
    }
}

/// Outcome of one digest send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestReport {
    pub recalls: usize,
    pub recipients: usize,
}

/// Render the digest for the configured window and send it through Brevo.
pub fn send_digest(
    db: &Database,
    cfg: &AppConfig,
    now: DateTime<Utc>,
) -> Result<DigestReport, ServerError> {
    let brevo = cfg
        .brevo
        .as_ref()
        .ok_or_else(|| ServerError::Config("BREVO_API_KEY is not set".into()))?;
    if cfg.digest_recipients.is_empty() {
        return Err(ServerError::Config("DIGEST_RECIPIENTS is empty".into()));
    }

    let filter = RecallFilter {
        updated_since: Some(now - Duration::days(cfg.digest_days)),
        ..Default::default()
    };
    let recalls = db.with_conn(|conn| list_recalls(conn, &filter))?;

    let html = digest_html(&recalls, cfg.digest_days, &cfg.public_base_url).into_string();
    let subject = digest_subject(recalls.len(), cfg.digest_days);

    let mailer = BrevoMailer::new(brevo).map_err(mailer_error)?;
    mailer
        .send_html(&cfg.digest_recipients, &subject, &html)
        .map_err(mailer_error)?;

    Ok(DigestReport {
        recalls: recalls.len(),
        recipients: cfg.digest_recipients.len(),
    })
}

fn mailer_error(e: MailerError) -> ServerError {
    match e {
        MailerError::NoRecipients => ServerError::Config(e.to_string()),
        other => ServerError::Upstream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recall::{RecallSnapshot, TempFdaRecall};

    fn recall(id: &str, source: RecallSource, title: &str) -> StoredRecall {
        StoredRecall {
            id: id.to_string(),
            source,
            title: title.to_string(),
            recall_date: None,
            affected_states: vec!["Ohio".into()],
            snapshot: RecallSnapshot::TempFda(TempFdaRecall {
                id: id.to_string(),
                title: title.to_string(),
                announced_date: None,
                company: None,
                product: None,
                reason: None,
                url: None,
                distribution_pattern: None,
                affected_states: vec!["Ohio".into()],
            }),
            display: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn groups_follow_source_order_and_skip_empty() {
        let recalls = vec![
            recall("a", RecallSource::TempFda, "Cookies"),
            recall("b", RecallSource::Usda, "Beef"),
        ];
        let groups = group_by_source(&recalls);
        let sources: Vec<RecallSource> = groups.iter().map(|(s, _)| *s).collect();
        assert_eq!(sources, vec![RecallSource::Usda, RecallSource::TempFda]);
    }

    #[test]
    fn html_links_to_recall_pages() {
        let recalls = vec![recall("a-1", RecallSource::TempFda, "Cookies & Cream")];
        let html = digest_html(&recalls, 7, "https://recalls.example.com").into_string();
        assert!(html.contains("https://recalls.example.com/recalls/TEMP_FDA/a-1"));
        assert!(html.contains("Cookies &amp; Cream"));
        assert!(html.contains("1 food recall updated in the last 7 days"));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let db = Database::new(":memory:");
        let res = send_digest(&db, &AppConfig::default(), Utc::now());
        assert!(matches!(res, Err(ServerError::Config(_))));
    }
}
