pub mod health;
pub mod issues;
pub mod metrics;
