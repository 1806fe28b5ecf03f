use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct LatencyStats {
    pub avg_ms: Option<i64>,
    pub min_ms: Option<i64>,
    pub max_ms: Option<i64>,
    pub p95_ms: Option<i64>,
    pub p99_ms: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionReport {
    pub id: Uuid,
    pub run_id: Uuid,
    pub total_count: i64,
    pub success_count: i64,
    pub failed_count: i64,
    #[sqlx(flatten)]
    pub latency: LatencyStats,
}
