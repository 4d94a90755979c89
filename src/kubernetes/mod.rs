// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for watch subscriptions and volume annotation.

pub mod subscription;
pub mod volumes;

pub use subscription::{wait_for_sync, EventHandler, Subscription};
pub use volumes::VolumeAnnotator;
