use chrono::{DateTime, Utc};
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub cron_expression: String,
    pub timezone: String,
    pub enabled: bool,
    pub last_fire_at: Option<DateTime<Utc>>,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct CreateJob {
    pub account_id: Uuid,
    pub name: String,
    pub cron_expression: String,
    #[builder(default = "UTC".to_string())]
    pub timezone: String,
}
