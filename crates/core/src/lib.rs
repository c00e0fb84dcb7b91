//! Core business logic for Splitnest.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//!
//! # Modules
//!
//! - `split` - Expense split calculation (equal / percentage / manual)
//! - `settlement` - Settlement validation and balance effects
//! - `auth` - Password hashing

pub mod auth;
pub mod settlement;
pub mod split;
