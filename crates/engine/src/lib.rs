// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sb-engine: Event bus, plugin registry, router, supervisor, and live hub

pub mod bus;
pub mod hub;
pub mod plugin;
pub mod registry;
pub mod router;
pub mod supervisor;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use bus::EventBus;
pub use hub::{DashboardState, Hub, StateRenderer};
pub use plugin::{
    CommandAware, CommandSpec, HealthChecker, Plugin, PluginError, Sink, SinkError, StoreAware,
    Transform, TransformError, WebhookError, WebhookHandler, WebhookRegistrar, WebhookSource,
    WorkspaceChannelProvider,
};
pub use registry::{PluginInfo, PluginRegistry, Registration, RegistryError};
pub use router::{NotifyFn, Router};
pub use supervisor::{Supervisor, TaskSpec};
