//! Server lifecycle: build once, start, serve, shut down.
//!
//! `start` activates the source before the change feed subscribes to it; `shutdown` unsubscribes
//! before the source is deactivated, so no listener outlives an activation.

use crate::config::ServerSettings;
use crate::error::{SchemaError, SourceError};
use crate::feed::{ChangeFeed, MemoryPubSub, PubSub};
use crate::routes::app;
use crate::source::Source;
use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    state: AppState,
    feed: ChangeFeed,
}

impl Server {
    /// Server with an in-process pub/sub.
    pub fn new(source: Arc<dyn Source>, settings: ServerSettings) -> Result<Self, SchemaError> {
        Self::with_pubsub(source, Arc::new(MemoryPubSub::default()), settings)
    }

    pub fn with_pubsub(source: Arc<dyn Source>, pubsub: Arc<dyn PubSub>, settings: ServerSettings) -> Result<Self, SchemaError> {
        let state = AppState::build(source, pubsub.clone(), settings)?;
        Ok(Server {
            state,
            feed: ChangeFeed::new(pubsub),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    pub async fn start(&self) -> Result<(), SourceError> {
        let source = self.state.source.as_ref();
        if !source.is_activated() {
            source.activate().await?;
        }
        if self.state.settings.feed {
            self.feed.attach(source)?;
        }
        tracing::info!(
            routes = self.state.routes.len(),
            graphql = self.state.graphql.is_some(),
            feed = self.feed.is_attached(),
            "server started"
        );
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<(), SourceError> {
        self.feed.detach(self.state.source.as_ref());
        self.state.source.deactivate().await?;
        tracing::info!("server stopped");
        Ok(())
    }

    /// Serve until the listener fails. Call [`Server::start`] first.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("listening on http://{}", addr);
        }
        axum::serve(listener, self.router()).await
    }
}
