// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.

use crate::client::ClientError;
use bb_core::ValidationError;
use std::fmt;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct UserError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Build the display form of any error reaching `main`
    pub fn explain(err: &anyhow::Error) -> Self {
        if let Some(client) = err.downcast_ref::<ClientError>() {
            return Self::from_client(client);
        }
        if let Some(invalid) = err.downcast_ref::<ValidationError>() {
            return UserError::new(invalid.to_string())
                .with_context("the asset was not sent to the daemon")
                .with_suggestion("See the accepted fields: bb asset add --help");
        }
        err.chain()
            .skip(1)
            .fold(UserError::new(err.to_string()), |e, cause| {
                e.with_context(cause.to_string())
            })
    }

    fn from_client(err: &ClientError) -> Self {
        match err {
            ClientError::DaemonNotRunning => UserError::new("bbd is not running")
                .with_context("no daemon is listening on the configured socket")
                .with_suggestion("Start it with: bb daemon start")
                .with_suggestion("Or point at another config with: bb --config <path>"),
            ClientError::DaemonStartFailed(reason) => {
                UserError::new(format!("bbd failed to start: {}", reason))
                    .with_suggestion("Check the daemon log (bbd.log in the state directory)")
            }
            ClientError::Rejected(message) => UserError::new(message.clone()),
            other => UserError::new(other.to_string()),
        }
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for UserError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_context_and_numbered_suggestions() {
        let err = UserError::new("Something went wrong")
            .with_context("First context")
            .with_suggestion("Try this")
            .with_suggestion("Or this");

        let output = format!("{}", err);
        assert!(output.contains("error: Something went wrong"));
        assert!(output.contains("-> First context"));
        assert!(output.contains("1. Try this"));
        assert!(output.contains("2. Or this"));
    }

    #[test]
    fn daemon_not_running_suggests_start() {
        let err = anyhow::Error::from(ClientError::DaemonNotRunning);
        let output = UserError::explain(&err).to_string();
        assert!(output.contains("bb daemon start"), "{}", output);
    }

    #[test]
    fn rejected_requests_show_the_daemon_message() {
        let err = anyhow::Error::from(ClientError::Rejected("asset disabled: promo".into()));
        assert_eq!(UserError::explain(&err).message, "asset disabled: promo");
    }
}
