//! # HTTP Server
//!
//! Combines the schema exchange, the served operations and the
//! observability routes into one axum application.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::exchange::SchemaExchange;
use super::exchange_routes::exchange_routes;
use super::observability_routes::{health_routes, observability_routes};
use crate::observability::{Event, Logger};

pub struct HttpServer {
    config: HttpServerConfig,
    exchange: Arc<SchemaExchange>,
    operations: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, exchange: Arc<SchemaExchange>) -> Self {
        Self {
            config,
            exchange,
            operations: Router::new(),
        }
    }

    /// Add operation routes, usually built with `avro_route`
    pub fn with_operations(mut self, operations: Router) -> Self {
        self.operations = self.operations.merge(operations);
        self
    }

    pub fn exchange(&self) -> &Arc<SchemaExchange> {
        &self.exchange
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    fn cors(&self) -> CorsLayer {
        if self.config.cors_origins.is_empty() {
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        } else {
            let origins: Vec<_> = self
                .config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }

    /// The assembled application
    pub fn router(self) -> Router {
        let cors = self.cors();
        let metrics = Arc::clone(self.exchange.cache().metrics());
        Router::new()
            .merge(health_routes())
            .merge(exchange_routes(self.exchange))
            .merge(self.operations)
            .nest("/observability", observability_routes(metrics))
            .layer(cors)
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self
            .config
            .bind_addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let operations = self.exchange.operations().join(",");

        let listener = TcpListener::bind(addr).await?;
        Logger::info(
            Event::ServerStart,
            &[("addr", &addr.to_string()), ("operations", &operations)],
        );
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
