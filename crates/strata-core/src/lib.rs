//! # Strata Core
//!
//! Core types, day counts, and calendars for the Strata curve calibration
//! kernel.
//!
//! This crate provides the foundational building blocks used throughout
//! Strata:
//!
//! - **Types**: `Date` and `Frequency`
//! - **Day Count Conventions**: ACT/360, ACT/365F, 30E/360
//! - **Business Day Calendars**: weekend and explicit-holiday calendars
//! - **Schedules**: backward-generated coupon date sequences

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod calendars;
pub mod daycounts;
pub mod error;
pub mod schedule;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use types::Date;
