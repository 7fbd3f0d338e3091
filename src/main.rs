use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::{signal, sync::mpsc};
use tracing::info;

use checkout_api as api;

use api::clients::{OrderBackendClient, PaymentGatewayClient};
use api::events::EventSender;
use api::handlers::AppServices;
use api::services::checkout::CheckoutService;
use api::services::payments::PaymentReconciler;
use api::services::subscriptions::SubscriptionMaterializer;
use api::webhooks::NotificationWebhookService;
use api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    api::handlers::health::mark_started();

    // Clients for the two external systems of record
    let order_backend = Arc::new(OrderBackendClient::new(&cfg.order_backend)?);
    let payment_gateway = Arc::new(PaymentGatewayClient::new(&cfg.payment_gateway)?);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = Arc::new(EventSender::new(event_tx));

    let webhook_service = if cfg.notification_webhook_url.is_some() {
        info!("Subscription notification delivery enabled");
        Some(Arc::new(NotificationWebhookService::new(
            cfg.notification_webhook_secret.clone(),
        )?))
    } else {
        info!("Notification webhook URL not configured; outbound notifications disabled");
        None
    };

    tokio::spawn(api::events::process_events(
        event_rx,
        webhook_service,
        cfg.notification_webhook_url.clone(),
    ));

    // Build services
    let reconciler = PaymentReconciler::new(order_backend.clone(), payment_gateway.clone());
    let materializer =
        SubscriptionMaterializer::new(order_backend.clone(), cfg.subscription.clone());
    let checkout = Arc::new(CheckoutService::new(
        order_backend,
        reconciler,
        materializer,
        Some(event_sender),
    ));

    let state = AppState {
        config: Arc::new(cfg.clone()),
        services: AppServices { checkout },
    };
    let app = api::handlers::router(state);

    let addr: SocketAddr = cfg
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid bind address {}", cfg.bind_addr()))?;
    info!("checkout-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }
}
