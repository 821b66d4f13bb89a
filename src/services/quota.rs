use crate::{api::ApiClient, error::Result, models::QuotaState};

/// Local mirror of the user's quota. The remote store is the system of
/// record; the only local mutation besides wholesale replacement is the
/// optimistic upload bump, which the next refresh reconciles or discards.
#[derive(Debug, Default)]
pub struct QuotaModel {
    state: QuotaState,
}

impl QuotaModel {
    pub fn state(&self) -> QuotaState {
        self.state
    }

    pub fn available_mb(&self) -> f64 {
        self.state.available_mb()
    }

    /// Fetches the authoritative `{used, total}` and replaces local state
    /// entirely. On failure the prior state stays untouched; no fallback
    /// value is invented.
    pub async fn refresh(&mut self, client: &ApiClient, username: &str) -> Result<QuotaState> {
        let fresh = client.get_user_quota(username).await?;
        self.state = fresh;
        Ok(fresh)
    }

    /// Accounts an admitted upload ahead of confirmation.
    pub fn note_optimistic_upload(&mut self, size_mb: f64) {
        self.state.used_mb += size_mb;
    }

    /// Discards the optimistic bump by restoring the snapshot taken before
    /// it, for the path where the upload request itself fails.
    pub fn restore(&mut self, state: QuotaState) {
        self.state = state;
    }
}
