// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rule and pending association types shared across the operator.

pub mod claim_key;
pub mod rule;

pub use claim_key::ClaimKey;
pub use rule::{Rule, RuleTable};
