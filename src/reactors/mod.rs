// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reactors that handle pod and claim watch events.

pub mod binding;
pub mod initialization;

pub use binding::ClaimBinder;
pub use initialization::PodInitializer;
