// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the rendering surface and content origins

pub mod fetch;
pub mod renderer;
pub mod traced;

pub use fetch::{FetchError, FetchOutcome, Fetcher, HttpFetcher};
pub use renderer::{
    LoadId, ProcessRenderer, RenderError, RendererAdapter, RendererSignal, SignalKind,
};
pub use traced::{TracedFetcher, TracedRenderer};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fetch::{FakeFetcher, FetchCall};
#[cfg(any(test, feature = "test-support"))]
pub use renderer::{FakeRenderer, RenderCall};
