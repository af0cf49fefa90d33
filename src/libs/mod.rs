//! Core library modules for truefocus.
//!
//! ## Layout
//!
//! - **Timer**: [`session`] state machine, [`effects`] dispatch, [`presence`] tracking
//! - **Usage**: [`activity`] sensing, [`sampler`] crediting, [`ledger`] storage and [`migrations`]
//! - **Reporting**: [`report`] aggregation, [`category`] rules, [`view`] tables, [`formatter`]
//! - **Runtime**: [`daemon`] watch loop, [`config`], [`data_storage`], [`messages`]

pub mod activity;
pub mod category;
pub mod config;
pub mod daemon;
pub mod data_storage;
pub mod effects;
pub mod formatter;
pub mod ledger;
pub mod messages;
pub mod migrations;
pub mod presence;
pub mod report;
pub mod sampler;
pub mod session;
pub mod view;
