// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured tracing for effects

/// Effects that can be logged with a stable name and key/value fields
pub trait TracedEffect {
    /// Span name, e.g. "load" or "record_failure"
    fn name(&self) -> &'static str;

    /// Fields attached to the span
    fn fields(&self) -> Vec<(&'static str, String)>;

    /// Fields rendered as `key=value` pairs for a single log line
    fn describe(&self) -> String {
        self.fields()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
