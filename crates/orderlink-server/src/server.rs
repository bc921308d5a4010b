use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use orderlink_auth::{AuthState, authentication_middleware};
use orderlink_core::{EventPublisher, InProcessBroker, WorkerPool};
use orderlink_db_memory::InMemoryStore;
use orderlink_storage::{DynStore, Order, User};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::RecordCache;
use crate::config::AppConfig;
use crate::consumer::EventConsumer;
use crate::fanout::FanoutUpdater;
use crate::services::{OrderService, UserService};
use crate::{handlers, middleware as app_middleware};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub orders: OrderService,
    pub user_cache: Arc<RecordCache<User>>,
    pub order_cache: Arc<RecordCache<Order>>,
    pub auth: AuthState,
    pub broker: Arc<InProcessBroker>,
    pub consumer: Arc<EventConsumer>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("users", &self.users)
            .field("orders", &self.orders)
            .field("consumer", &self.consumer)
            .finish()
    }
}

/// Wire stores, caches, broker, pools and the event consumer together.
///
/// The consumer subscribes before this returns, so no event published
/// through the returned state can be missed. Must be called from within a
/// tokio runtime; the consume loop is spawned on it.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let auth = AuthState::new(cfg.auth.clone()).context("invalid auth configuration")?;

    let user_store: DynStore<User> = InMemoryStore::<User>::new_shared();
    let order_store: DynStore<Order> = InMemoryStore::<Order>::new_shared();
    let user_cache = RecordCache::new_shared(user_store.clone());
    let order_cache = RecordCache::new_shared(order_store.clone());

    let broker = InProcessBroker::new_shared(cfg.broker.capacity);
    let publisher = EventPublisher::new(broker.clone(), cfg.broker.topic.as_str());

    let discovery = WorkerPool::new("fanout-discovery", cfg.fanout.discovery_threads)
        .context("failed to start discovery pool")?;
    let apply = WorkerPool::new("fanout-apply", cfg.fanout.apply_threads)
        .context("failed to start apply pool")?;
    let fanout = FanoutUpdater::new(
        order_store.clone(),
        order_cache.clone(),
        Arc::new(discovery),
        Arc::new(apply),
    )
    .with_max_in_flight(cfg.fanout.max_in_flight);

    let consumer = Arc::new(EventConsumer::new(Arc::new(fanout)));
    let receiver = broker.subscribe(&cfg.broker.topic);
    tokio::spawn(consumer.clone().run(receiver));

    tracing::info!(
        topic = %cfg.broker.topic,
        discovery_threads = cfg.fanout.discovery_threads,
        apply_threads = cfg.fanout.apply_threads,
        max_in_flight = ?cfg.fanout.max_in_flight,
        "Application state initialized"
    );

    Ok(AppState {
        users: UserService::new(user_store, user_cache.clone(), publisher),
        orders: OrderService::new(order_store, order_cache.clone()),
        user_cache,
        order_cache,
        auth,
        broker,
        consumer,
    })
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let auth_state = state.auth.clone();

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/auth/register", post(handlers::register_user))
        .route("/users", get(handlers::list_users))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/{id}/report", get(handlers::user_report))
        .route("/api/v1/orders", post(handlers::create_order))
        .route("/api/v1/orders/user/my-orders", get(handlers::my_orders))
        .route(
            "/api/v1/orders/{id}",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        .with_state(state)
        // Outermost last: request id runs before the trace span is opened.
        .layer(middleware::from_fn_with_state(
            auth_state,
            authentication_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct OrderlinkServer {
    addr: SocketAddr,
    app: Router,
    state: AppState,
}

#[derive(Default)]
pub struct ServerBuilder {
    config: AppConfig,
    addr: Option<SocketAddr>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<OrderlinkServer> {
        self.config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
        let state = build_state(&self.config)?;
        let app = build_app(state.clone(), &self.config);
        Ok(OrderlinkServer {
            addr: self.addr.unwrap_or_else(|| self.config.addr()),
            app,
            state,
        })
    }
}

impl OrderlinkServer {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Ends the consume loop; the worker pools go with the last state clone.
        self.state.broker.close();
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing_subscriber::layer::{Context, Layer};
    use tracing_subscriber::prelude::*;

    /// Records the `request_id` field of every `http.request` span.
    #[derive(Clone, Default)]
    struct SpanRequestIds(Arc<Mutex<Vec<String>>>);

    struct RequestIdField(Option<String>);

    impl Visit for RequestIdField {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "request_id" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for SpanRequestIds {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            if attrs.metadata().name() != "http.request" {
                return;
            }
            let mut field = RequestIdField(None);
            attrs.record(&mut field);
            if let Some(value) = field.0 {
                self.0.lock().unwrap().push(value);
            }
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_trace_span_carries_request_id() {
        let seen = SpanRequestIds::default();
        let subscriber = tracing_subscriber::registry().with(seen.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut cfg = AppConfig::default();
        cfg.auth.secret = "0123456789abcdef0123456789abcdef".into();
        let app = build_app(build_state(&cfg).unwrap(), &cfg);

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .header(app_middleware::REQUEST_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()[app_middleware::REQUEST_ID_HEADER], "abc-123");

        let res = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let generated = res.headers()[app_middleware::REQUEST_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();

        let seen = seen.0.lock().unwrap().clone();
        assert_eq!(seen, vec!["abc-123".to_string(), generated]);
    }
}
