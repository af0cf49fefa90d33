//! # TrueFocus
//!
//! A presence-aware focus timer for the command line.
//!
//! ## Features
//!
//! - **Focus Sessions**: Pomodoro work/break cycles with long breaks every fourth cycle
//! - **Presence Awareness**: Work pauses when a desk sensor reports you away
//! - **Device Sync**: Timer telemetry and state commands pushed to ThingsBoard
//! - **Usage Ledger**: Per-hour, per-application foreground time stored as JSON
//! - **Reports**: Daily, weekly and range summaries with category totals
//!
//! ## Usage
//!
//! ```rust,no_run
//! use truefocus::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod api;
pub mod commands;
pub mod libs;
