use crate::{
    api::ApiClient,
    error::{AppError, Result},
    models::{PaymentDraft, PlanOffer},
};

/// Steps of the plan-purchase modal flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PurchasePhase {
    Closed,
    PlanSelection,
    PaymentEntry,
    Submitting,
}

/// Takes the user from plan selection through payment entry to a purchase
/// request. Submission files a request for admin approval; the quota bump
/// only becomes visible once a later refresh observes the approved change.
pub struct PlanPurchaseFlow {
    phase: PurchasePhase,
    selected: Option<PlanOffer>,
    draft: PaymentDraft,
}

impl Default for PlanPurchaseFlow {
    fn default() -> Self {
        PlanPurchaseFlow {
            phase: PurchasePhase::Closed,
            selected: None,
            draft: PaymentDraft::default(),
        }
    }
}

impl PlanPurchaseFlow {
    pub fn phase(&self) -> PurchasePhase {
        self.phase
    }

    pub fn selected_plan(&self) -> Option<PlanOffer> {
        self.selected
    }

    pub fn draft(&self) -> &PaymentDraft {
        &self.draft
    }

    pub fn open(&mut self) {
        if self.phase == PurchasePhase::Closed {
            self.phase = PurchasePhase::PlanSelection;
        }
    }

    /// Closing the modal discards the draft and the plan target.
    pub fn close(&mut self) {
        self.phase = PurchasePhase::Closed;
        self.selected = None;
        self.draft = PaymentDraft::default();
    }

    pub fn select_plan(&mut self, plan: PlanOffer) {
        if self.phase == PurchasePhase::PlanSelection {
            self.selected = Some(plan);
            self.phase = PurchasePhase::PaymentEntry;
        }
    }

    /// Keeps only digits, grouped in fours, capped at 16 digits. Edits that
    /// would push past the cap or introduce non-digits are dropped, as the
    /// form field does.
    pub fn set_card_number(&mut self, value: &str) {
        let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.len() <= 16 && cleaned.chars().all(|c| c.is_ascii_digit()) {
            self.draft.card_number = group_in_fours(&cleaned);
        }
    }

    pub fn set_card_name(&mut self, value: &str) {
        self.draft.card_name = value.to_string();
    }

    /// Digits only, with the slash auto-inserted after the month.
    pub fn set_expiry(&mut self, value: &str) {
        let digits: String = value.chars().filter(char::is_ascii_digit).collect();
        let normalized = if digits.len() >= 2 {
            format!("{}/{}", &digits[..2], &digits[2..digits.len().min(4)])
        } else {
            digits
        };
        if normalized.len() <= 5 {
            self.draft.expiry_date = normalized;
        }
    }

    pub fn set_cvv(&mut self, value: &str) {
        if value.len() <= 3 && value.chars().all(|c| c.is_ascii_digit()) {
            self.draft.cvv = value.to_string();
        }
    }

    pub fn set_billing_address(&mut self, value: &str) {
        self.draft.billing_address = value.to_string();
    }

    pub fn set_city(&mut self, value: &str) {
        self.draft.city = value.to_string();
    }

    pub fn set_postal_code(&mut self, value: &str) {
        self.draft.postal_code = value.to_string();
    }

    pub fn set_country(&mut self, value: &str) {
        self.draft.country = value.to_string();
    }

    /// Structural checks only; card data is otherwise opaque. Violations
    /// never reach the wire.
    pub fn validate(&self) -> Result<()> {
        if self.draft.card_digits().len() != 16 {
            return Err(AppError::Validation(
                "Please enter a valid 16-digit card number".to_string(),
            ));
        }
        if self.draft.card_name.trim().is_empty() {
            return Err(AppError::Validation(
                "Please enter the cardholder name".to_string(),
            ));
        }
        if self.draft.expiry_date.len() != 5 {
            return Err(AppError::Validation(
                "Please enter expiry date (MM/YY)".to_string(),
            ));
        }
        if self.draft.cvv.len() != 3 {
            return Err(AppError::Validation(
                "Please enter a valid 3-digit CVV".to_string(),
            ));
        }
        if self.draft.billing_address.trim().is_empty() {
            return Err(AppError::Validation(
                "Please enter billing address".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates, then files the purchase request. Success clears the draft
    /// and closes the flow; any failure returns to payment entry with the
    /// entered values intact so the user need not re-type them.
    pub async fn submit(&mut self, client: &ApiClient, username: &str) -> Result<()> {
        if self.phase != PurchasePhase::PaymentEntry {
            return Err(AppError::Validation("No purchase in progress".to_string()));
        }
        let plan = self
            .selected
            .ok_or_else(|| AppError::Validation("No plan selected".to_string()))?;
        self.validate()?;

        self.phase = PurchasePhase::Submitting;
        match client
            .request_storage(username, plan.storage_gb, plan.price_xaf, &self.draft)
            .await
        {
            Ok(()) => {
                tracing::info!(storage_gb = plan.storage_gb, price = plan.price_xaf, "storage request submitted");
                self.close();
                Ok(())
            }
            Err(err) => {
                self.phase = PurchasePhase::PaymentEntry;
                Err(err)
            }
        }
    }
}

fn group_in_fours(digits: &str) -> String {
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
}
