use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use fleet_billing::config::database::DatabaseConfig;
use fleet_billing::config::EnvironmentConfig;
use fleet_billing::database::DatabaseConnection;
use fleet_billing::repositories::{FleetStore, InMemoryFleetStore, PgFleetStore};
use fleet_billing::services::maintenance::chance_from_config;
use fleet_billing::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env().context("invalid configuration")?;

    // Configurar logging
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚗 Fleet Billing - motor de reglas de car sharing");
    info!("================================================");
    info!("🌍 Entorno: {}", config.environment);

    let store: Arc<dyn FleetStore> = match &config.database_url {
        Some(url) => {
            let connection = match DatabaseConnection::connect(&DatabaseConfig::new(url.clone())).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            info!("✅ PostgreSQL conectado");
            Arc::new(PgFleetStore::new(connection.pool().clone()))
        }
        None => {
            warn!("⚠️ DATABASE_URL no definida: se usa el almacén en memoria, los datos no persisten");
            Arc::new(InMemoryFleetStore::new())
        }
    };

    let chance = chance_from_config(&config.maintenance);
    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_url()))?;
    let app = create_router(AppState::new(store, config, chance));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("   GET|POST /api/vehicles, GET|PUT|DELETE /api/vehicles/:plate");
    info!("   POST /api/vehicles/:plate/fares, POST /api/vehicles/:plate/maintenance");
    info!("   GET|POST /api/customers, GET|PUT|DELETE /api/customers/:id, POST /api/customers/:id/top-up");
    info!("   POST /api/trips/start, POST /api/trips/finish");
    info!("   POST /api/import?format=fleet|car_sharing");
    info!("   GET  /api/statistics[/most-used-car|/top-paying-customers|/average-distance]");
    info!("   GET  /api/events");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            e
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el manejador de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el manejador de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
