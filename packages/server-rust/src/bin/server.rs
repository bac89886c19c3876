//! Process bootstrap: wires storage, the bus bridge, and the HTTP module,
//! then serves until ctrl-c.

use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gazette_server::bus::{
    BusConfig, BusTransport, CorrelationRegistry, InMemoryBus, ReplyChannel, ReplyListener,
    RequestClient,
};
use gazette_server::network::{NetworkConfig, NetworkModule};
use gazette_server::service::{ArticlesService, BusRemoteLookups, ViewsService};
use gazette_server::storage::{ArticleStore, MemoryArticleStore};

/// Command-line and environment configuration.
#[derive(Debug, Parser)]
#[command(name = "gazette-server", about = "Articles microservice")]
struct ServerArgs {
    /// Bind address for the HTTP server.
    #[arg(long, env = "GAZETTE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP port; 0 means OS-assigned.
    #[arg(long, env = "GAZETTE_PORT", default_value_t = 8080)]
    port: u16,

    /// Prometheus exporter port; 0 disables the exporter.
    #[arg(long, env = "GAZETTE_METRICS_PORT", default_value_t = 9090)]
    metrics_port: u16,

    /// Reply topic this instance announces in outbound requests.
    #[arg(long, env = "GAZETTE_REPLY_TOPIC", default_value = "articles.replies")]
    reply_topic: String,

    /// Durable subscription shared by all instances of this service.
    #[arg(long, env = "GAZETTE_REPLY_SUBSCRIPTION", default_value = "articles-server")]
    reply_subscription: String,

    /// NATS server URL; without it the in-process bus is used.
    #[cfg(feature = "nats")]
    #[arg(long, env = "GAZETTE_NATS_URL")]
    nats_url: Option<String>,

    /// PostgreSQL connection string; without it articles live in memory.
    #[cfg(feature = "postgres")]
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

async fn build_store(_args: &ServerArgs) -> anyhow::Result<Arc<dyn ArticleStore>> {
    #[cfg(feature = "postgres")]
    if let Some(url) = &_args.database_url {
        let store = gazette_server::storage::PostgresArticleStore::connect(url).await?;
        store.ensure_schema().await?;
        info!("using postgres article store");
        return Ok(Arc::new(store));
    }
    info!("using in-memory article store");
    Ok(Arc::new(MemoryArticleStore::new()))
}

async fn build_transport(_args: &ServerArgs) -> anyhow::Result<Arc<dyn BusTransport>> {
    #[cfg(feature = "nats")]
    if let Some(url) = &_args.nats_url {
        let bus = gazette_server::bus::NatsBus::connect(url).await?;
        info!(%url, "connected to NATS");
        return Ok(Arc::new(bus));
    }
    warn!("no broker configured; using in-process bus, remote enrichment will degrade");
    Ok(Arc::new(InMemoryBus::new()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();

    if args.metrics_port > 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], args.metrics_port))
            .install()?;
        info!(port = args.metrics_port, "prometheus exporter listening");
    }

    let bus_config = BusConfig {
        reply_channel: ReplyChannel::new(&args.reply_topic, &args.reply_subscription),
        ..BusConfig::default()
    };

    let store = build_store(&args).await?;
    let transport = build_transport(&args).await?;

    let registry = Arc::new(CorrelationRegistry::new());
    let client = Arc::new(RequestClient::new(
        Arc::clone(&transport),
        Arc::clone(&registry),
        &bus_config,
    ));
    let remote = Arc::new(BusRemoteLookups::new(client, bus_config.topics.clone()));

    let articles = Arc::new(ArticlesService::new(Arc::clone(&store), remote));
    let views = Arc::new(ViewsService::new(store));

    let network_config = NetworkConfig {
        host: args.host.clone(),
        port: args.port,
        ..NetworkConfig::default()
    };
    let mut module = NetworkModule::new(network_config, articles, views, Arc::clone(&registry));
    let shutdown_ctrl = module.shutdown_controller();

    let listener_handle = ReplyListener::new(transport, registry, &bus_config)
        .spawn(shutdown_ctrl.shutdown_receiver());

    let port = module.start().await?;
    info!(port, "gazette server up");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("ctrl-c received; shutting down");
        })
        .await?;

    // Serving already triggered the drain; the listener observes the same
    // signal and exits on its own.
    let _ = listener_handle.await;
    Ok(())
}
