// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rule table resolution, storage and reload.

pub mod loader;
pub mod resolver;
pub mod store;

pub use loader::{parse_rules, RuleReloader, RuleSource};
pub use resolver::{aliases_for, attributes_for, resolve};
pub use store::RuleStore;
