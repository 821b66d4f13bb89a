use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::{
    api::ApiClient,
    config::Config,
    error::{AppError, Result},
    models::{
        FileRecord, PaymentDraft, PlanOffer, QuotaExceededContext, QuotaState, StorageLevel,
    },
    services::{
        naming::resolve_unique_name,
        purchase::{PlanPurchaseFlow, PurchasePhase},
        quota::QuotaModel,
        registry::FileRegistry,
        upload::{UploadAdmissionController, UploadPhase},
    },
    session::SessionContext,
};

/// Immutable view of controller state, published over a watch channel after
/// every change. Presentation renders from this and nothing else.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DashboardSnapshot {
    pub username: String,
    pub quota: QuotaState,
    pub storage_level: StorageLevel,
    pub storage_warning: bool,
    pub files: Vec<FileRecord>,
    pub upload_phase: UploadPhase,
    pub upload_progress: u8,
    pub quota_exceeded: Option<QuotaExceededContext>,
    pub purchase_phase: PurchasePhase,
    pub selected_plan: Option<PlanOffer>,
    pub payment_draft: PaymentDraft,
}

/// Composes quota, registry, upload admission and the purchase flow behind
/// a single mutation surface. All remote effects go through the `ApiClient`
/// collaborator; all state changes are announced through the snapshot
/// channel.
pub struct DashboardController {
    config: Config,
    client: ApiClient,
    session: SessionContext,
    quota: QuotaModel,
    registry: FileRegistry,
    upload: UploadAdmissionController,
    purchase: PlanPurchaseFlow,
    quota_exceeded: Option<QuotaExceededContext>,
    warning_dismissed: bool,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
    poll_cancel: Option<CancellationToken>,
}

impl DashboardController {
    pub fn new(config: Config, client: ApiClient, session: SessionContext) -> Self {
        let quota = QuotaModel::default();
        let initial = DashboardSnapshot {
            username: session.username.clone(),
            quota: quota.state(),
            storage_level: StorageLevel::Ok,
            storage_warning: false,
            files: Vec::new(),
            upload_phase: UploadPhase::Idle,
            upload_progress: 0,
            quota_exceeded: None,
            purchase_phase: PurchasePhase::Closed,
            selected_plan: None,
            payment_draft: PaymentDraft::default(),
        };
        let (snapshot_tx, _) = watch::channel(initial);

        DashboardController {
            config,
            client,
            session,
            quota,
            registry: FileRegistry::default(),
            upload: UploadAdmissionController::default(),
            purchase: PlanPurchaseFlow::default(),
            quota_exceeded: None,
            warning_dismissed: false,
            snapshot_tx,
            poll_cancel: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.session.username
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let quota = self.quota.state();
        let level = quota.level(
            self.config.warn_threshold_percent,
            self.config.critical_threshold_percent,
        );
        DashboardSnapshot {
            username: self.session.username.clone(),
            quota,
            storage_level: level,
            storage_warning: level != StorageLevel::Ok && !self.warning_dismissed,
            files: self.registry.files().to_vec(),
            upload_phase: self.upload.phase(),
            upload_progress: self.upload.progress(),
            quota_exceeded: self.quota_exceeded.clone(),
            purchase_phase: self.purchase.phase(),
            selected_plan: self.purchase.selected_plan(),
            payment_draft: self.purchase.draft().clone(),
        }
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.snapshot());
    }

    /// One full reconciliation pass: quota then files. Both are attempted
    /// even if the first fails; the first error is reported.
    pub async fn refresh(&mut self) -> Result<()> {
        let quota_result = self.refresh_quota().await;
        let files_result = self.refresh_files().await;
        quota_result.and(files_result)
    }

    pub async fn refresh_quota(&mut self) -> Result<QuotaState> {
        let result = self.quota.refresh(&self.client, &self.session.username).await;
        if let Ok(state) = &result {
            // A refresh that shows the rejected file now fits dissolves the
            // exceeded-quota dialog on its own.
            if let Some(ctx) = &self.quota_exceeded {
                if state.available_mb() >= ctx.file_size_mb {
                    self.quota_exceeded = None;
                    self.upload.clear_rejection();
                }
            }
            let level = state.level(
                self.config.warn_threshold_percent,
                self.config.critical_threshold_percent,
            );
            if level == StorageLevel::Ok {
                self.warning_dismissed = false;
            }
        }
        self.publish();
        result
    }

    pub async fn refresh_files(&mut self) -> Result<()> {
        let result = self.registry.load(&self.client, &self.session.username).await;
        self.publish();
        result
    }

    /// Upload intent for an on-disk file; size comes from the filesystem.
    pub async fn upload_path(&mut self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Validation("Not a valid file path".to_string()))?
            .to_string();
        let size_bytes = tokio::fs::metadata(path).await?.len();
        self.upload_named(&file_name, size_bytes).await
    }

    /// The optimistic-then-confirmed upload sequence: admission against the
    /// current quota, collision-free name, placeholder insert, remote call,
    /// reconcile. No real file content moves; the remote store accounts by
    /// name and size.
    pub async fn upload_named(&mut self, file_name: &str, size_bytes: u64) -> Result<()> {
        let pending = match self.upload.admit(
            file_name,
            size_bytes,
            self.quota.available_mb(),
            &self.registry.names(),
        ) {
            Ok(pending) => pending,
            Err(err) => {
                if let AppError::QuotaExceeded(ctx) = &err {
                    tracing::info!(
                        file = %ctx.file_name,
                        size_mb = ctx.file_size_mb,
                        available_mb = ctx.available_mb,
                        "upload refused by quota gate"
                    );
                    self.quota_exceeded = Some(ctx.clone());
                }
                self.publish();
                return Err(err);
            }
        };

        let pre_upload_quota = self.quota.state();
        let placeholder = FileRecord::placeholder(
            &self.session.username,
            &pending.resolved_name,
            pending.size_mb,
            Utc::now(),
        );
        self.registry.optimistic_insert(placeholder);
        self.quota.note_optimistic_upload(pending.size_mb);
        self.publish();

        // Cosmetic progress only; the ticker publishes through its own
        // sender clone so it never needs the controller lock.
        let progress_tx = self.snapshot_tx.clone();
        let ticker = self.upload.start_progress_ticker(
            Duration::from_millis(self.config.upload_tick_millis),
            move |value| {
                progress_tx.send_modify(|snap| snap.upload_progress = value);
            },
        );

        let outcome = self
            .client
            .upload_file(&self.session.username, &pending.resolved_name, pending.size_mb)
            .await;
        ticker.cancel();

        match outcome {
            Ok(()) => {
                self.upload.begin_confirming();
                self.publish();

                // Converge to the server's view of both files and quota. A
                // failed reconciliation here is logged and left to the next
                // poll; the upload itself already succeeded.
                if let Err(err) = self
                    .registry
                    .confirm_or_rollback(&self.client, &self.session.username)
                    .await
                {
                    tracing::warn!(error = %err, "post-upload file reconciliation failed");
                }
                if let Err(err) = self.quota.refresh(&self.client, &self.session.username).await {
                    tracing::warn!(error = %err, "post-upload quota reconciliation failed");
                }

                self.upload.finish();
                self.publish();
                tracing::info!(file = %pending.resolved_name, size_mb = pending.size_mb, "upload confirmed");
                Ok(())
            }
            Err(err) => {
                // Discard the speculative record and the quota bump, then
                // converge on whatever the server actually has.
                self.quota.restore(pre_upload_quota);
                if let Err(load_err) = self
                    .registry
                    .confirm_or_rollback(&self.client, &self.session.username)
                    .await
                {
                    tracing::warn!(error = %load_err, "rollback reconciliation failed");
                }
                self.upload.fail();
                self.publish();
                tracing::warn!(file = %pending.resolved_name, error = %err, "upload failed");
                Err(err)
            }
        }
    }

    /// Rename with the same collision policy as upload: the requested name
    /// is resolved against every visible name before it is sent.
    pub async fn rename_file(&mut self, file_id: &str, requested_name: &str) -> Result<String> {
        if requested_name.trim().is_empty() {
            return Err(AppError::Validation("File name cannot be empty".to_string()));
        }
        if self.registry.get(file_id).is_none() {
            return Err(AppError::Validation("Unknown file".to_string()));
        }

        let unique_name = resolve_unique_name(requested_name, &self.registry.names());
        let result = self
            .registry
            .rename(&self.client, &self.session.username, file_id, &unique_name)
            .await;
        self.publish();
        match result {
            Ok(()) => {
                tracing::info!(file_id, new_name = %unique_name, "file renamed");
                Ok(unique_name)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn delete_file(&mut self, file_id: &str) -> Result<()> {
        let result = self
            .registry
            .remove(&self.client, &self.session.username, file_id)
            .await;
        // The server released quota for the deleted file; pick that up now
        // rather than waiting a poll cycle.
        if let Err(err) = self.quota.refresh(&self.client, &self.session.username).await {
            tracing::warn!(error = %err, "post-delete quota refresh failed");
        }
        self.publish();
        if result.is_ok() {
            tracing::info!(file_id, "file deleted");
        }
        result
    }

    pub fn dismiss_quota_exceeded(&mut self) {
        self.quota_exceeded = None;
        self.upload.clear_rejection();
        self.publish();
    }

    pub fn dismiss_storage_warning(&mut self) {
        self.warning_dismissed = true;
        self.publish();
    }

    // Purchase flow passthroughs. Presentation never touches the flow
    // directly.

    pub fn open_purchase(&mut self) {
        self.purchase.open();
        self.publish();
    }

    pub fn close_purchase(&mut self) {
        self.purchase.close();
        self.publish();
    }

    pub fn select_plan(&mut self, plan: PlanOffer) {
        self.purchase.select_plan(plan);
        self.publish();
    }

    pub fn set_payment_field(&mut self, field: PaymentField, value: &str) {
        match field {
            PaymentField::CardNumber => self.purchase.set_card_number(value),
            PaymentField::CardName => self.purchase.set_card_name(value),
            PaymentField::Expiry => self.purchase.set_expiry(value),
            PaymentField::Cvv => self.purchase.set_cvv(value),
            PaymentField::BillingAddress => self.purchase.set_billing_address(value),
            PaymentField::City => self.purchase.set_city(value),
            PaymentField::PostalCode => self.purchase.set_postal_code(value),
            PaymentField::Country => self.purchase.set_country(value),
        }
        self.publish();
    }

    pub async fn submit_purchase(&mut self) -> Result<()> {
        let result = self.purchase.submit(&self.client, &self.session.username).await;
        if result.is_ok() {
            // The request only awaits admin approval; the dialog that asked
            // for more space has served its purpose either way.
            self.quota_exceeded = None;
            self.upload.clear_rejection();
        }
        self.publish();
        result
    }

    /// Starts the fixed-cadence background reconciliation. The token ties
    /// the task to this controller; a tick that loses the race against
    /// teardown is discarded without touching state.
    pub async fn start_polling(controller: &Arc<Mutex<DashboardController>>) -> CancellationToken {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let weak = Arc::downgrade(controller);

        let interval_secs = {
            let mut guard = controller.lock().await;
            guard.poll_cancel = Some(cancel.clone());
            guard.config.poll_interval_secs
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(controller) = weak.upgrade() else { break };
                        let mut guard = controller.lock().await;
                        if token.is_cancelled() {
                            break;
                        }
                        if let Err(err) = guard.refresh().await {
                            tracing::warn!(error = %err, "background refresh failed");
                        }
                    }
                }
            }
            tracing::debug!("poll loop stopped");
        });

        cancel
    }

    /// Teardown: stop polling, clear the persisted session.
    pub async fn logout(&mut self) -> Result<()> {
        if let Some(cancel) = self.poll_cancel.take() {
            cancel.cancel();
        }
        SessionContext::clear(&self.config.session_file).await?;
        tracing::info!(username = %self.session.username, "logged out");
        Ok(())
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        if let Some(cancel) = self.poll_cancel.take() {
            cancel.cancel();
        }
    }
}

/// Editable fields of the payment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentField {
    CardNumber,
    CardName,
    Expiry,
    Cvv,
    BillingAddress,
    City,
    PostalCode,
    Country,
}
