use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Webhook;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ordered endpoint list built from a collection's webhooks; null order
/// sorts last, ties broken by `created_at`.
pub fn order_webhooks(mut webhooks: Vec<(Webhook, DateTime<Utc>)>) -> Vec<Webhook> {
    webhooks.sort_by(|(a, a_created), (b, b_created)| {
        match (a.execution_order, b.execution_order) {
            (Some(a), Some(b)) => a.cmp(&b).then(a_created.cmp(b_created)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a_created.cmp(b_created),
        }
    });
    webhooks.into_iter().map(|(w, _)| w).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::HttpMethod;

    fn webhook(order: Option<i32>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            job_id: None,
            collection_id: Some(Uuid::new_v4()),
            url: "https://example.com".into(),
            method: HttpMethod::Get,
            headers: serde_json::json!({}),
            query_params: serde_json::json!({}),
            body_template: None,
            content_type: None,
            execution_order: order,
        }
    }

    #[test]
    fn null_order_sorts_last() {
        let now = Utc::now();
        let a = webhook(Some(2));
        let b = webhook(None);
        let c = webhook(Some(1));
        let ordered = order_webhooks(vec![(a.clone(), now), (b.clone(), now), (c.clone(), now)]);
        assert_eq!(ordered[0].id, c.id);
        assert_eq!(ordered[1].id, a.id);
        assert_eq!(ordered[2].id, b.id);
    }
}
