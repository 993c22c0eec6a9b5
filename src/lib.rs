//! Household retirement projection engine: staged allocation returns,
//! salary-linked contributions, financed major expenses, and
//! inflation-adjusted drawdown, served over a JSON HTTP API.

pub mod api;
pub mod core;
