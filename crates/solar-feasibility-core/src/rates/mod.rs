pub mod bill;
pub mod census;
pub mod details;
pub mod escalation;
