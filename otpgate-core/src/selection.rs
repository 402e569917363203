//! The (pure) sender-adapter selection strategy.
//!
//! This module only knows about adapter *names* and which of them claim to support the current
//! request; it never touches an adapter or the network. `otpgate-service` evaluates each
//! registered adapter's `supports(...)` predicate and hands the resulting candidate list (plus
//! any prior `senderName` recorded on the session) to [`select_adapter`].

use std::collections::HashMap;

/// Why adapter selection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// No registered adapter claims to support the request.
    #[error("no adapter supports this request")]
    Unsupported,
    /// The session already committed to an adapter, but it no longer supports this request
    /// (or was removed from the registry).
    #[error("the session's prior adapter no longer supports this request")]
    PriorAdapterUnavailable,
}

/// A deterministic (country code, transport) → adapter-name routing table, plus a fallback.
///
/// `country code` is the numeric calling code (e.g. `1` for the US, `44` for the UK); `transport`
/// is the transport's [`otpgate_types::Transport::tag`].
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<(u16, &'static str), String>,
    default_adapter: String,
}

impl RoutingTable {
    /// Builds a routing table that always falls back to `default_adapter`.
    pub fn with_default(default_adapter: impl Into<String>) -> Self {
        Self {
            routes: HashMap::new(),
            default_adapter: default_adapter.into(),
        }
    }

    /// Registers an explicit route for `(country_code, transport_tag)`.
    pub fn route(
        mut self,
        country_code: u16,
        transport_tag: &'static str,
        adapter_name: impl Into<String>,
    ) -> Self {
        self.routes
            .insert((country_code, transport_tag), adapter_name.into());
        self
    }

    fn preferred_adapter(&self, country_code: Option<u16>, transport_tag: &str) -> &str {
        country_code
            .and_then(|cc| self.routes.get(&(cc, transport_tag)))
            .map(String::as_str)
            .unwrap_or(&self.default_adapter)
    }
}

/// Selects one adapter name for this attempt, given the set of adapter names that claim to
/// support the request (`candidates`), any adapter already committed to the session
/// (`prior_sender_name`), and the static [`RoutingTable`].
///
/// This function is pure: called twice with the same arguments, it returns the same result.
pub fn select_adapter(
    candidates: &[&str],
    prior_sender_name: Option<&str>,
    routing: &RoutingTable,
    country_code: Option<u16>,
    transport_tag: &str,
) -> Result<String, SelectionError> {
    if let Some(prior) = prior_sender_name {
        return if candidates.contains(&prior) {
            Ok(prior.to_owned())
        } else {
            Err(SelectionError::PriorAdapterUnavailable)
        };
    }

    if candidates.is_empty() {
        return Err(SelectionError::Unsupported);
    }

    let preferred = routing.preferred_adapter(country_code, transport_tag);
    if candidates.contains(&preferred) {
        return Ok(preferred.to_owned());
    }

    // Deterministic fallback: the first candidate in registration order (candidates is built
    // by the registry in a stable iteration order by the caller).
    Ok(candidates[0].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honors_prior_sender_name_when_still_supported() {
        let routing = RoutingTable::with_default("fallback");
        let result = select_adapter(&["a", "b"], Some("b"), &routing, None, "sms");
        assert_eq!(result, Ok("b".to_owned()));
    }

    #[test]
    fn fails_when_prior_sender_no_longer_supports_request() {
        let routing = RoutingTable::with_default("fallback");
        let result = select_adapter(&["a"], Some("b"), &routing, None, "sms");
        assert_eq!(result, Err(SelectionError::PriorAdapterUnavailable));
    }

    #[test]
    fn uses_routing_table_when_country_matches() {
        let routing = RoutingTable::with_default("fallback").route(1, "sms", "us-provider");
        let result = select_adapter(&["fallback", "us-provider"], None, &routing, Some(1), "sms");
        assert_eq!(result, Ok("us-provider".to_owned()));
    }

    #[test]
    fn falls_back_to_default_when_no_route_matches() {
        let routing = RoutingTable::with_default("fallback").route(44, "sms", "uk-provider");
        let result = select_adapter(&["fallback", "uk-provider"], None, &routing, Some(1), "sms");
        assert_eq!(result, Ok("fallback".to_owned()));
    }

    #[test]
    fn fails_when_nothing_supports_the_request() {
        let routing = RoutingTable::with_default("fallback");
        let result = select_adapter(&[], None, &routing, None, "sms");
        assert_eq!(result, Err(SelectionError::Unsupported));
    }

    #[test]
    fn is_pure_same_inputs_same_output() {
        let routing = RoutingTable::with_default("fallback").route(1, "sms", "us-provider");
        let a = select_adapter(&["fallback", "us-provider"], None, &routing, Some(1), "sms");
        let b = select_adapter(&["fallback", "us-provider"], None, &routing, Some(1), "sms");
        assert_eq!(a, b);
    }
}
