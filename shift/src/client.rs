//! Connections to Postgres through `tokio-postgres`.

use std::io::BufReader;

use config::shared::{DatabaseConfig, IntoConnectOptions};
use rustls::ClientConfig;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::{Client, Config, Connection, NoTls, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{Instrument, error, info};

use crate::error::ShiftResult;

/// Spawns a background task driving a Postgres connection until it terminates.
fn spawn_postgres_connection<T>(connection: Connection<Socket, T::Stream>)
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let span = tracing::Span::current();
    let task = async move {
        let result = connection.await;

        match result {
            Err(err) => error!("an error occurred during the postgres connection: {}", err),
            Ok(()) => info!("postgres connection terminated successfully"),
        }
    }
    .instrument(span);

    // The connection ends when the `Client` that owns it is dropped.
    tokio::spawn(task);
}

/// Opens a client to the database described by `database_config`.
pub async fn connect(database_config: &DatabaseConfig) -> ShiftResult<Client> {
    let config: Config = database_config.connect_options()?;

    if database_config.tls.enabled {
        connect_tls(config, &database_config.tls.trusted_root_certs).await
    } else {
        connect_no_tls(config).await
    }
}

async fn connect_no_tls(config: Config) -> ShiftResult<Client> {
    let (client, connection) = config.connect(NoTls).await?;
    spawn_postgres_connection::<NoTls>(connection);

    info!("successfully connected to postgres without tls");

    Ok(client)
}

async fn connect_tls(config: Config, trusted_root_certs: &str) -> ShiftResult<Client> {
    let mut root_store = rustls::RootCertStore::empty();
    let mut root_certs_reader = BufReader::new(trusted_root_certs.as_bytes());
    for cert in rustls_pemfile::certs(&mut root_certs_reader) {
        let cert = cert?;
        root_store.add(cert)?;
    }

    let tls_config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let (client, connection) = config.connect(MakeRustlsConnect::new(tls_config)).await?;
    spawn_postgres_connection::<MakeRustlsConnect>(connection);

    info!("successfully connected to postgres with tls");

    Ok(client)
}
