//! Swing Index System core: domain types, indicators, engine, strategy, data.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, sides, signals, position legs)
//! - Wilder's Accumulative Swing Index, swing points and the ADXR gate
//! - Full-recompute and incremental indicator engines with identical output
//! - The position state machine and its SAR / trailing-SAR scans
//! - Market data sources (CSV directory, Yahoo Finance, seeded synthetic)

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;
