pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod utils;

pub use api::ApiClient;
pub use config::Config;
pub use controller::{DashboardController, DashboardSnapshot, PaymentField};
pub use error::{AppError, Result};
pub use session::{Role, SessionContext};
