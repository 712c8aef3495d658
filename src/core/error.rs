//! Error taxonomy for sessions and providers.

use std::fmt::Display;
use thiserror::Error as ThisError;

/// Identifies which external collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    ShortInterest,
    MarketData,
    Discussion,
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ProviderKind::ShortInterest => "Nasdaq Data Link",
                ProviderKind::MarketData => "Yahoo Finance",
                ProviderKind::Discussion => "Reddit",
            }
        )
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{provider} request failed: {source}")]
    Provider {
        provider: ProviderKind,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub fn provider(provider: ProviderKind, source: impl Into<anyhow::Error>) -> Self {
        Error::Provider {
            provider,
            source: source.into(),
        }
    }

    /// Name of the failing provider, if this is a provider error.
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        match self {
            Error::Provider { provider, .. } => Some(*provider),
            Error::Configuration(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
