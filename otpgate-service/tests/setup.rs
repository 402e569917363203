use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use otpgate_core::{LimiterSchedule, RoutingTable};
use otpgate_service::config::{Environment, OrchestratorConfig};
use otpgate_service::rate_limiters::RateLimiters;
use otpgate_service::sender_adapter::last_digits::LastDigitsAdapter;
use otpgate_service::sender_adapter::mock_upstream::MockUpstreamAdapter;
use otpgate_service::sender_adapter::AdapterRegistry;
use otpgate_service::session_store::in_memory::InMemorySessionStore;
use otpgate_service::orchestrator::{OrchestratorSettings, VerificationOrchestrator};
use otpgate_service::{api, OtpgateServiceBuilder};
use otpgate_test_utils::scripted_adapter::ScriptedBehavior;
use tokio_util::sync::CancellationToken;

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);
const UPSTREAM_CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn dev_config() -> OrchestratorConfig {
    OrchestratorConfig {
        environment: Environment::Dev,
        listen_port: 0,
        default_session_ttl: DEFAULT_SESSION_TTL,
        default_adapter: "last-digits".to_owned(),
        upstream_call_timeout: UPSTREAM_CALL_TIMEOUT,
        db_connection_string: None,
        db_max_connections: 10,
        completion_channel_capacity: 1024,
    }
}

/// Starts a full dev-profile service (in-memory store, `last-digits` + `mock-upstream`
/// adapters, all-allow rate limiters) behind a [`TestServer`].
pub(crate) async fn start_dev_server() -> TestServer {
    let builder = OtpgateServiceBuilder::init(dev_config(), CancellationToken::new())
        .await
        .expect("dev service initializes");
    let (router, _completion_rx, _tasks) = builder.build();
    TestServer::builder()
        .http_transport()
        .build(router)
        .expect("can build test server")
}

/// Starts a service whose `session-creation` limiter denies every attempt with a fixed
/// `retry_after`, for testing the rate-limited-creation scenario without waiting out a real
/// budget.
pub(crate) async fn start_server_denying_session_creation(retry_after: Duration) -> TestServer {
    let store = Arc::new(InMemorySessionStore::new());
    let adapters = AdapterRegistry::new(vec![Arc::new(LastDigitsAdapter::new(
        DEFAULT_SESSION_TTL,
    ))]);
    let routing = RoutingTable::with_default("last-digits");

    let mut limiters = RateLimiters::allow_all();
    limiters.session_creation = otpgate_core::RateLimiter::new(LimiterSchedule {
        max_attempts: 0,
        window: Duration::from_secs(60),
        backoff_base: retry_after,
        max_backoff: retry_after,
    });

    let settings = OrchestratorSettings {
        default_session_ttl: DEFAULT_SESSION_TTL,
        upstream_call_timeout: UPSTREAM_CALL_TIMEOUT,
        completion_channel_capacity: 16,
        default_adapter: "last-digits".to_owned(),
    };
    let (orchestrator, _completion_rx) =
        VerificationOrchestrator::new(settings, store, Arc::new(limiters), adapters, routing);

    let router = api::routes(Arc::new(orchestrator), CancellationToken::new());
    TestServer::builder()
        .http_transport()
        .build(router)
        .expect("can build test server")
}

/// Starts a service wired with a `mock-upstream` adapter scripted to reject every send, for
/// testing the sender-rejects scenario.
pub(crate) async fn start_server_with_rejecting_mock_upstream() -> TestServer {
    let store = Arc::new(InMemorySessionStore::new());
    let behavior = Arc::new(ScriptedBehavior::scripted(
        vec![
            otpgate_service::sender_adapter::mock_upstream::StartVerificationOutcome::Rejected(
                "blocked destination".to_owned(),
            ),
        ],
        "000000",
    ));
    let adapters = AdapterRegistry::new(vec![Arc::new(MockUpstreamAdapter::new(
        DEFAULT_SESSION_TTL,
        behavior,
    ))]);
    let routing = RoutingTable::with_default("mock-upstream");

    let settings = OrchestratorSettings {
        default_session_ttl: DEFAULT_SESSION_TTL,
        upstream_call_timeout: UPSTREAM_CALL_TIMEOUT,
        completion_channel_capacity: 16,
        default_adapter: "mock-upstream".to_owned(),
    };
    let (orchestrator, _completion_rx) = VerificationOrchestrator::new(
        settings,
        store,
        Arc::new(RateLimiters::allow_all()),
        adapters,
        routing,
    );

    let router = api::routes(Arc::new(orchestrator), CancellationToken::new());
    TestServer::builder()
        .http_transport()
        .build(router)
        .expect("can build test server")
}
