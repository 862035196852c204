use serde::Serialize;

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_mailings: i64,
    pub active_mailings: i64,
    pub unique_recipients: i64,
    pub attempts_success: i64,
    pub attempts_failed: i64,
    pub attempts_total: i64,
}
