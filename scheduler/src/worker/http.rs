//! Outbound HTTP call for a single job execution: URL/query encoding, body
//! templating, and response capture. Grounded on `execute_job.py`'s
//! `_execute_webhook` (query-param appending, `raise_for_status` semantics).

use chrono::Utc;

use crate::domain::execution::RESPONSE_BODY_TRUNCATE_BYTES;
use crate::domain::result::truncate;
use crate::domain::Webhook;

pub struct WebhookOutcome {
    pub status: u16,
    pub body: String,
}

/// Substitutes the small body-templating vocabulary. `{{timestamp}}`
/// becomes an RFC3339 UTC timestamp; unrecognized placeholders are left
/// untouched.
fn render_body(template: &str) -> String {
    template.replace("{{timestamp}}", &Utc::now().to_rfc3339())
}

fn build_url(webhook: &Webhook) -> String {
    let params = webhook.query_params_map();
    if params.is_empty() {
        return webhook.url.clone();
    }
    let encoded: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    let separator = if webhook.url.contains('?') { '&' } else { '?' };
    format!("{}{separator}{}", webhook.url, encoded.join("&"))
}

pub async fn execute_webhook(
    client: &reqwest::Client,
    webhook: &Webhook,
) -> anyhow::Result<WebhookOutcome> {
    let url = build_url(webhook);
    let method = reqwest::Method::from_bytes(webhook.method.as_str().as_bytes())?;
    let mut request = client.request(method, &url);

    for (key, value) in webhook.headers_map() {
        request = request.header(key, value);
    }
    if let Some(content_type) = &webhook.content_type {
        request = request.header("content-type", content_type);
    }
    if let Some(template) = &webhook.body_template {
        request = request.body(render_body(template));
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let truncated = truncate(&body, RESPONSE_BODY_TRUNCATE_BYTES);

    if !status.is_success() && !status.is_redirection() {
        anyhow::bail!("webhook returned status {status}: {truncated}");
    }

    Ok(WebhookOutcome {
        status: status.as_u16(),
        body: truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::HttpMethod;
    use uuid::Uuid;

    fn webhook(url: &str, query: serde_json::Value, template: Option<&str>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            job_id: Some(Uuid::new_v4()),
            collection_id: None,
            url: url.to_string(),
            method: HttpMethod::Post,
            headers: serde_json::json!({}),
            query_params: query,
            body_template: template.map(|s| s.to_string()),
            content_type: Some("application/json".to_string()),
            execution_order: None,
        }
    }

    #[test]
    fn build_url_appends_query_params_with_question_mark() {
        let w = webhook(
            "https://example.com/hook",
            serde_json::json!({"a": "1"}),
            None,
        );
        assert_eq!(build_url(&w), "https://example.com/hook?a=1");
    }

    #[test]
    fn build_url_preserves_existing_query_string() {
        let w = webhook(
            "https://example.com/hook?existing=1",
            serde_json::json!({"a": "2"}),
            None,
        );
        assert_eq!(build_url(&w), "https://example.com/hook?existing=1&a=2");
    }

    #[test]
    fn render_body_substitutes_timestamp() {
        let rendered = render_body(r#"{"at": "{{timestamp}}"}"#);
        assert!(!rendered.contains("{{timestamp}}"));
        assert!(rendered.contains("at"));
    }
}
