use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "http_method", rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An outbound HTTP call definition, attached either to a Job or to a
/// Collection (never both — enforced by the caller, not at the type level,
/// since sqlx FromRow maps a single nullable-foreign-key table).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Webhook {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub collection_id: Option<Uuid>,
    pub url: String,
    pub method: HttpMethod,
    pub headers: serde_json::Value,
    pub query_params: serde_json::Value,
    pub body_template: Option<String>,
    pub content_type: Option<String>,
    /// Execution order within a collection; lower fires first. Unset sorts
    /// last. Meaningless for job-attached webhooks.
    pub execution_order: Option<i32>,
}

impl Webhook {
    pub fn headers_map(&self) -> HashMap<String, String> {
        self.headers
            .as_object()
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn query_params_map(&self) -> HashMap<String, String> {
        self.query_params
            .as_object()
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct CreateWebhook {
    pub url: String,
    pub method: HttpMethod,
    #[builder(default)]
    pub headers: serde_json::Value,
    #[builder(default)]
    pub query_params: serde_json::Value,
    #[builder(default)]
    pub body_template: Option<String>,
    #[builder(default)]
    pub content_type: Option<String>,
    #[builder(default)]
    pub execution_order: Option<i32>,
}
