// Risk check: manual risk records + screening -> decision, stored analysis.

pub mod analysis;
pub mod decision;
pub mod service;

pub use analysis::Analysis;
pub use service::{
    RiskCheckOutcome, RiskCheckRequest, RiskConfirmRequest, RiskService, load_seed_records,
};
