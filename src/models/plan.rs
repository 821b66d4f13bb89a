use serde::Serialize;

/// Static catalogue entry for a storage upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanOffer {
    pub storage_gb: u32,
    pub price_xaf: u32,
    pub popular: bool,
}

/// The fixed upgrade catalogue; defined at startup, never persisted.
pub const PLANS: [PlanOffer; 3] = [
    PlanOffer {
        storage_gb: 2,
        price_xaf: 20_000,
        popular: false,
    },
    PlanOffer {
        storage_gb: 3,
        price_xaf: 30_000,
        popular: true,
    },
    PlanOffer {
        storage_gb: 5,
        price_xaf: 50_000,
        popular: false,
    },
];
