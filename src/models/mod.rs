// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod customization;
pub mod design;
pub mod user;

pub use customization::{Customization, Position, TextSize, Theme};
pub use design::{Design, DesignSource, NewDesign};
pub use user::{Account, IdentitySession};
