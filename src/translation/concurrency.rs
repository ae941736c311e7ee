/*!
 * Provider-specific concurrency tuning.
 *
 * This module provides in-flight request limits based on provider characteristics
 * such as rate limits and whether the endpoint is keyed or public.
 */

use crate::app_config::ProviderKind;

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
    /// Whether the service throttles anonymous callers aggressively
    pub throttles_anonymous: bool,
}

impl ProviderProfile {
    /// Get the default profile for a given provider
    pub fn for_provider(provider: ProviderKind) -> Self {
        match provider {
            ProviderKind::Azure => Self {
                // Keyed endpoint, generous per-second quota
                max_concurrent_requests: 10,
                throttles_anonymous: false,
            },
            ProviderKind::Google => Self {
                // Keyless web endpoint starts answering 429 quickly
                max_concurrent_requests: 4,
                throttles_anonymous: true,
            },
            ProviderKind::LibreTranslate => Self {
                // Public instances are small; self-hosted ones can raise this
                max_concurrent_requests: 2,
                throttles_anonymous: true,
            },
        }
    }

    /// Get effective concurrent requests, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override
            .filter(|n| *n > 0)
            .unwrap_or(self.max_concurrent_requests)
    }
}
