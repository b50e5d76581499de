pub mod solar_metrics;
