pub mod amortization;
pub mod cash_flow;
pub mod sizing;
