use serde::{Deserialize, Serialize};

/// Fill grade of the quota bar, thresholds come from `Config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageLevel {
    Ok,
    Warning,
    Critical,
}

/// Authoritative used/total pair for the current user, in megabytes.
/// Replaced wholesale by every successful quota refresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaState {
    pub used_mb: f64,
    pub total_mb: f64,
}

impl QuotaState {
    pub fn percentage(&self) -> f64 {
        self.used_mb / self.total_mb * 100.0
    }

    /// May go negative when the local state is stale; corrected by the
    /// next refresh.
    pub fn available_mb(&self) -> f64 {
        self.total_mb - self.used_mb
    }

    pub fn level(&self, warn_percent: f64, critical_percent: f64) -> StorageLevel {
        let pct = self.percentage();
        if pct >= critical_percent {
            StorageLevel::Critical
        } else if pct >= warn_percent {
            StorageLevel::Warning
        } else {
            StorageLevel::Ok
        }
    }
}

impl Default for QuotaState {
    // 2GB starter quota, shown until the first authoritative refresh lands.
    fn default() -> Self {
        QuotaState {
            used_mb: 0.0,
            total_mb: 2048.0,
        }
    }
}

/// Why an upload was refused admission. Lives until the user dismisses the
/// rejection or a quota refresh shows the file now fits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaExceededContext {
    pub file_name: String,
    pub file_size_mb: f64,
    pub available_mb: f64,
}
