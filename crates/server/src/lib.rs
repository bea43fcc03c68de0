//! HTTP front end for the property price estimator

pub mod api;
pub mod config;
