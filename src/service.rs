//! Process bootstrap for RetainerTrack.
//!
//! This module wires together:
//! - configuration
//! - the SQLite record store and its migrations
//! - the resolution cache, rebuilt from the store
//! - the ingestor and packet dispatcher

use std::sync::Arc;

use tracing::{info, warn};

use crate::codec::SocialListLayout;
use crate::config::Config;
use crate::dispatch::{ListingDecoder, OpcodeTable, PacketDispatcher};
use crate::infra::{Ingestor, ResolutionCache, Result, SqliteRecordStore};
use crate::query::{RetainerNameResolver, WorldContext};

/// Running RetainerTrack instance
pub struct RetainerTrack {
    config: Config,
    store: Arc<SqliteRecordStore>,
    cache: Arc<ResolutionCache>,
    ingestor: Ingestor,
    dispatcher: Arc<PacketDispatcher>,
}

impl RetainerTrack {
    /// Open the store, rebuild the cache and get ready to ingest
    ///
    /// `game_version` selects the identity-mapping opcode unless the
    /// configuration overrides it.
    pub async fn open(config: Config, game_version: &str) -> Result<Self> {
        Self::open_with(config, game_version, None, SocialListLayout::default()).await
    }

    /// Like [`open`](Self::open), with the host's packet decoding plugged in
    ///
    /// Marketplace pages on the configured opcode are dropped unless a
    /// `listing_decoder` is given.
    pub async fn open_with(
        config: Config,
        game_version: &str,
        listing_decoder: Option<Arc<dyn ListingDecoder>>,
        social_list_layout: SocialListLayout,
    ) -> Result<Self> {
        social_list_layout.validate()?;

        info!("Starting RetainerTrack v{}", env!("CARGO_PKG_VERSION"));
        info!("  Database: {}", config.database_path);
        info!("  Max connections: {}", config.max_connections);

        let store =
            SqliteRecordStore::from_path(&config.database_path, config.max_connections).await?;
        store.initialize().await?;
        info!("Database migrations applied");

        let store = Arc::new(store);
        let cache = Arc::new(ResolutionCache::new(store.clone()).await?);
        let ingestor = Ingestor::new(cache.clone())?;

        let opcodes = OpcodeTable::resolve(
            game_version,
            config.content_id_opcode,
            config.market_board_opcode,
        );
        if opcodes.market_board_offerings.is_some() && listing_decoder.is_none() {
            warn!("Market board opcode configured without a listing decoder");
        }

        let mut dispatcher = PacketDispatcher::new(ingestor.clone(), opcodes)
            .with_social_list_layout(social_list_layout);
        if let Some(decoder) = listing_decoder {
            dispatcher = dispatcher.with_listing_decoder(decoder);
        }
        let dispatcher = Arc::new(dispatcher);

        info!("RetainerTrack is ready to ingest");

        Ok(Self {
            config,
            store,
            cache,
            ingestor,
            dispatcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<SqliteRecordStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn dispatcher(&self) -> &Arc<PacketDispatcher> {
        &self.dispatcher
    }

    /// Query facade bound to the host's notion of the current world
    pub fn resolver(&self, world: Arc<dyn WorldContext>) -> RetainerNameResolver {
        RetainerNameResolver::new(self.cache.clone(), world)
    }

    /// Wait for in-flight ingestion, then close the database
    ///
    /// Returns `false` if the drain timed out; whatever was still running is
    /// abandoned and healed by the next startup's rebuild.
    pub async fn shutdown(self) -> bool {
        info!("Shutting down RetainerTrack");
        let drained = self
            .ingestor
            .wait_for_drain(self.config.drain_timeout)
            .await;
        if !drained {
            warn!(
                in_flight = self.ingestor.in_flight(),
                "Closing database with ingestion still in flight"
            );
        }
        self.store.close().await;
        info!(stats = %self.cache.stats_json(), "RetainerTrack stopped");
        drained
    }
}
