//! A disposable Postgres instance for exercising [`otpgate_service::session_store::postgres`].

use otpgate_service::session_store::postgres::PostgresSessionStore;
use secrecy::SecretString;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner as _;

/// Starts a Postgres `testcontainers` instance and returns it alongside its connection string.
///
/// The container is torn down when the returned handle is dropped; keep it alive for the
/// duration of the test.
pub async fn postgres_testcontainer() -> eyre::Result<(ContainerAsync<Postgres>, String)> {
    let container = Postgres::default().start().await?;
    let connection_string = format!(
        "postgres://postgres:postgres@{}:{}/postgres",
        container.get_host().await?,
        container.get_host_port_ipv4(5432).await?
    );
    tracing::debug!("started postgres testcontainer at {connection_string}");
    Ok((container, connection_string))
}

/// Starts a Postgres `testcontainers` instance and returns it alongside an initialized
/// [`PostgresSessionStore`] (table creation happens inside `PostgresSessionStore::init`).
///
/// The container handle must be kept alive for as long as `store` is used.
pub async fn postgres_session_store(
    max_connections: u32,
) -> eyre::Result<(ContainerAsync<Postgres>, PostgresSessionStore)> {
    let (container, connection_string) = postgres_testcontainer().await?;
    let store = PostgresSessionStore::init(&SecretString::from(connection_string), max_connections)
        .await?;
    Ok((container, store))
}
