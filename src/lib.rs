pub mod config;
pub mod corridor;
pub mod estimator;
pub mod fetch;
pub mod forecast;
pub mod observations;
pub mod output;
pub mod providers;
