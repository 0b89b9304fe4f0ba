//! Export, import and overview statistics

use super::JudgmentStore;
use crate::models::Judgment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use xat_common::time::same_day;
use xat_common::{Error, Result};

/// Current export format version
pub const EXPORT_VERSION: &str = "2.0";

/// Portable snapshot of every judgment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Judgment>,
}

/// Counts shown on the overview screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_accounts: usize,
    pub updated_today: usize,
}

pub async fn export_bundle(store: &dyn JudgmentStore) -> Result<ExportBundle> {
    let accounts = store.list_judgments().await?;
    info!("Exporting {} judgments", accounts.len());
    Ok(ExportBundle {
        version: EXPORT_VERSION.to_string(),
        exported_at: Utc::now(),
        accounts,
    })
}

/// Put every record of the bundle (overwriting same-identity records)
pub async fn import_bundle(store: &dyn JudgmentStore, bundle: &ExportBundle) -> Result<usize> {
    if bundle.version.trim().is_empty() {
        return Err(Error::InvalidInput("export bundle has no version".to_string()));
    }
    for judgment in &bundle.accounts {
        store.put_judgment(judgment).await?;
    }
    info!("Imported {} judgments (format {})", bundle.accounts.len(), bundle.version);
    Ok(bundle.accounts.len())
}

/// Total judgments and how many were updated on the same calendar day as `now`
pub async fn overview_stats(store: &dyn JudgmentStore, now: DateTime<Utc>) -> Result<OverviewStats> {
    let judgments = store.list_judgments().await?;
    Ok(OverviewStats {
        total_accounts: judgments.len(),
        updated_today: judgments
            .iter()
            .filter(|j| same_day(&j.last_updated, &now))
            .count(),
    })
}
