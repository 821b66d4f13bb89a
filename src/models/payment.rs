use serde::{Deserialize, Serialize};

pub const DEFAULT_COUNTRY: &str = "Cameroon";

/// Scratch payment form scoped to one purchase attempt. Serialized verbatim
/// as the `payment_details` field of a storage request; card data is opaque
/// to this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub card_number: String,
    pub card_name: String,
    pub expiry_date: String,
    pub cvv: String,
    pub billing_address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Default for PaymentDraft {
    fn default() -> Self {
        PaymentDraft {
            card_number: String::new(),
            card_name: String::new(),
            expiry_date: String::new(),
            cvv: String::new(),
            billing_address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl PaymentDraft {
    /// Card digits with cosmetic grouping stripped.
    pub fn card_digits(&self) -> String {
        self.card_number.chars().filter(|c| !c.is_whitespace()).collect()
    }
}
