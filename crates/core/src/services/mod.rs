pub mod journal_service;
pub mod metrics_service;
