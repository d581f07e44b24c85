//! Message parser (component C): deterministic, language-aware extraction
//! of a [`TaskOffer`] from an email body.

mod fields;
mod language;

pub use language::Language;

use intake_model::offer::TaskOffer;
use scraper::Html;

/// Parse one email into zero or more offers. One offer is produced per
/// accept-URL found; if none is found, a single offer is produced with
/// `accept_url: None` so on-hold-without-link messages still reach the
/// acceptor. A message with no recognizable fields at all yields a single
/// all-`None` offer rather than nothing, so callers always have something
/// to log.
pub fn parse_offer(
    subject: &str,
    text: &str,
    html: Option<&str>,
    content_language: Option<&str>,
) -> Vec<TaskOffer> {
    let raw_text = format!("{subject}\n{text}\n{}", html.unwrap_or(""));
    let language = language::detect_language(content_language, html, &raw_text);
    let labels = language.labels();

    let parsed_html = html.map(Html::parse_document);
    let parsed_html_ref = parsed_html.as_ref();

    let order_id = fields::extract_order_id(&raw_text);
    let status = fields::extract_status(parsed_html_ref, &raw_text, &labels).unwrap_or_default();
    let workflow_name = fields::extract_workflow_name(parsed_html_ref, &labels);
    let amount_words = fields::extract_amount_words(parsed_html_ref, &raw_text, &labels);
    let planned_end_date = fields::extract_planned_end_date(parsed_html_ref, &raw_text, &labels);

    let body_for_urls = html.unwrap_or(text);
    let accept_urls = fields::extract_accept_urls(body_for_urls);

    if accept_urls.is_empty() {
        return vec![TaskOffer {
            order_id,
            workflow_name,
            status,
            amount_words,
            planned_end_date,
            accept_url: None,
        }];
    }

    accept_urls
        .into_iter()
        .map(|url| TaskOffer {
            order_id: order_id.clone(),
            workflow_name: workflow_name.clone(),
            status: status.clone(),
            amount_words,
            planned_end_date: planned_end_date.clone(),
            accept_url: Some(url),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <html lang="en">
        <body>
        <p>New task [#77]</p>
        <table>
          <tr><td>Status</td><td>New</td></tr>
          <tr><td>Workflow name</td><td>Review translation</td></tr>
          <tr><td>Amounts</td><td>3,000</td></tr>
          <tr><td>Planned end</td><td>23.01.2026 6:00 PM</td></tr>
        </table>
        <a href="https://projects.moravia.com/Task/abc123/detail/notification?command=Accept">Accept</a>
        </body>
        </html>
    "#;

    #[test]
    fn s1_simple_accept_extracts_every_field() {
        let offers = parse_offer("New order", "", Some(SAMPLE_HTML), None);
        assert_eq!(offers.len(), 1);
        let offer = &offers[0];
        assert_eq!(offer.order_id.as_deref(), Some("77"));
        assert_eq!(offer.workflow_name.as_deref(), Some("Review translation"));
        assert_eq!(offer.status, "New");
        assert_eq!(offer.amount_words, Some(3000.0));
        assert_eq!(offer.planned_end_date.as_deref(), Some("2026-01-23 18:00"));
        assert!(offer.accept_url.as_deref().unwrap().contains("abc123"));
    }

    #[test]
    fn s4_on_hold_without_link_still_parses() {
        let html = "<html lang=\"en\"><body><table><tr><td>Status</td><td>On Hold</td></tr></table></body></html>";
        let offers = parse_offer("Hold notice", "", Some(html), None);
        assert_eq!(offers.len(), 1);
        assert!(offers[0].is_on_hold());
        assert!(offers[0].accept_url.is_none());
    }

    #[test]
    fn multiple_accept_urls_yield_multiple_offers() {
        let html = r#"<html lang="en"><body>
            <a href="https://projects.moravia.com/Task/aaa/detail/notification?command=Accept">a</a>
            <a href="https://projects.moravia.com/Task/bbb/detail/notification?command=Accept">b</a>
        </body></html>"#;
        let offers = parse_offer("subj", "", Some(html), None);
        assert_eq!(offers.len(), 2);
        assert_ne!(offers[0].accept_url, offers[1].accept_url);
    }

    #[test]
    fn parser_is_idempotent() {
        let first = parse_offer("New order", "", Some(SAMPLE_HTML), None);
        let second = parse_offer("New order", "", Some(SAMPLE_HTML), None);
        assert_eq!(first, second);
    }
}
