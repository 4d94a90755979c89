// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mutating admission webhook injecting host aliases into Deployments.

pub mod mutate;
pub mod server;
pub mod tls;

pub use mutate::mutate;
pub use server::{WebhookServer, WebhookState};
pub use tls::load_tls_config;
