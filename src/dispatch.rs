//! Inbound packet routing
//!
//! The host hands every zone-down message to [`PacketDispatcher::handle`]
//! together with the player's current world. Tracked opcodes are turned into
//! facts and queued on the [`Ingestor`]; everything else is ignored.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, trace, warn};

use crate::codec::{
    decode_content_id_mapping, decode_social_list_page, DecodeError, SocialListLayout,
};
use crate::domain::{ContentIdMapping, ListingEntry, WorldId};
use crate::infra::Ingestor;

/// Game build whose identity-mapping opcode is known
pub const KNOWN_GAME_VERSION: &str = "2023.02.03.0000.0000";

/// Identity-mapping opcode on [`KNOWN_GAME_VERSION`]
pub const CONTENT_ID_MAPPING_OPCODE: u16 = 0x01C4;

/// Minimum time between two alliance roster polls
pub const ROSTER_POLL_INTERVAL: Duration = Duration::from_secs(180);

/// Opcodes the dispatcher reacts to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpcodeTable {
    /// Fixed 40-byte content id to name packet
    pub content_id_mapping: Option<u16>,
    /// Marketplace offerings page
    pub market_board_offerings: Option<u16>,
}

impl OpcodeTable {
    /// Identity-mapping opcode for a game build, if known
    pub fn for_game_version(game_version: &str) -> Option<u16> {
        match game_version {
            KNOWN_GAME_VERSION => Some(CONTENT_ID_MAPPING_OPCODE),
            _ => None,
        }
    }

    /// Build the table for a game build
    ///
    /// `content_id_override` wins over the per-version lookup. Without either,
    /// identity packets are not tracked.
    pub fn resolve(
        game_version: &str,
        content_id_override: Option<u16>,
        market_board_offerings: Option<u16>,
    ) -> Self {
        let content_id_mapping =
            content_id_override.or_else(|| Self::for_game_version(game_version));

        if content_id_mapping.is_none() {
            warn!(
                version = game_version,
                "Not tracking content id mappings, unsupported game version"
            );
        }

        Self {
            content_id_mapping,
            market_board_offerings,
        }
    }
}

/// Decoder for marketplace offerings pages, provided by the host
#[cfg_attr(test, automock)]
pub trait ListingDecoder: Send + Sync {
    fn decode_listings(&self, payload: &[u8]) -> Result<Vec<ListingEntry>, DecodeError>;
}

/// What [`PacketDispatcher::handle`] did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A fact was queued for ingestion
    Submitted,
    /// The opcode is tracked but the message produced no fact
    Dropped,
    /// The opcode is not tracked
    Ignored,
}

/// Limits how often a roster snapshot is taken
pub struct RosterThrottle {
    interval: Duration,
    last_poll: Mutex<Option<Instant>>,
}

impl RosterThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: Mutex::new(None),
        }
    }

    /// Whether a poll is due now; a `true` answer starts a new interval
    pub fn should_poll(&self) -> bool {
        let Ok(mut last_poll) = self.last_poll.lock() else {
            return false;
        };
        let now = Instant::now();

        if last_poll.is_some_and(|last| now.duration_since(last) < self.interval) {
            return false;
        }

        *last_poll = Some(now);
        true
    }
}

impl Default for RosterThrottle {
    fn default() -> Self {
        Self::new(ROSTER_POLL_INTERVAL)
    }
}

/// Routes inbound messages to the ingestor
pub struct PacketDispatcher {
    ingestor: Ingestor,
    opcodes: OpcodeTable,
    listing_decoder: Option<Arc<dyn ListingDecoder>>,
    social_list_layout: SocialListLayout,
    roster_throttle: RosterThrottle,
}

impl PacketDispatcher {
    pub fn new(ingestor: Ingestor, opcodes: OpcodeTable) -> Self {
        Self {
            ingestor,
            opcodes,
            listing_decoder: None,
            social_list_layout: SocialListLayout::default(),
            roster_throttle: RosterThrottle::default(),
        }
    }

    /// Decode social list pages with `layout`
    pub fn with_social_list_layout(mut self, layout: SocialListLayout) -> Self {
        self.social_list_layout = layout;
        self
    }

    /// Decode marketplace offerings pages with `decoder`
    pub fn with_listing_decoder(mut self, decoder: Arc<dyn ListingDecoder>) -> Self {
        self.listing_decoder = Some(decoder);
        self
    }

    /// Poll the alliance roster at most once per `interval`
    pub fn with_roster_interval(mut self, interval: Duration) -> Self {
        self.roster_throttle = RosterThrottle::new(interval);
        self
    }

    pub fn opcodes(&self) -> &OpcodeTable {
        &self.opcodes
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Route one inbound message
    ///
    /// Never blocks and never fails; malformed payloads are logged and
    /// dropped.
    pub fn handle(&self, opcode: u16, payload: &[u8], current_world: Option<WorldId>) -> Dispatch {
        if self.opcodes.market_board_offerings == Some(opcode) {
            return self.handle_market_board_payload(payload, current_world);
        }

        if self.opcodes.content_id_mapping == Some(opcode) {
            return match decode_content_id_mapping(payload) {
                Ok(mapping) => {
                    let name = match mapping.player_name.as_str() {
                        "" => "<unknown>",
                        name => name,
                    };
                    trace!(content_id = %mapping.content_id, name, "Content id belongs to player");
                    self.ingestor.submit_mapping(mapping);
                    Dispatch::Submitted
                }
                Err(e) => {
                    debug!(error = %e, opcode, "Dropping undecodable content id mapping");
                    Dispatch::Dropped
                }
            };
        }

        Dispatch::Ignored
    }

    /// Queue a marketplace page already decoded by the host
    ///
    /// Skipped when the current world is unknown.
    pub fn handle_market_board_offerings(
        &self,
        current_world: Option<WorldId>,
        entries: Vec<ListingEntry>,
    ) -> Dispatch {
        match current_world.filter(|world| !world.is_zero()) {
            Some(world_id) => {
                self.ingestor.submit_market_board_page(world_id, entries);
                Dispatch::Submitted
            }
            None => {
                info!("Skipping market board handler, current world unknown");
                Dispatch::Dropped
            }
        }
    }

    /// Queue every named player on a social list result page
    pub fn handle_social_list_page(&self, page: &[u8]) -> Dispatch {
        match decode_social_list_page(page, &self.social_list_layout) {
            Ok(mappings) => self.handle_roster(mappings),
            Err(e) => {
                debug!(error = %e, "Dropping undecodable social list page");
                Dispatch::Dropped
            }
        }
    }

    /// Queue a roster snapshot (party, alliance, social list)
    ///
    /// Members without a content id or name are left out; an empty snapshot
    /// is not submitted.
    pub fn handle_roster(&self, members: Vec<ContentIdMapping>) -> Dispatch {
        let mappings: Vec<ContentIdMapping> = members
            .into_iter()
            .filter(|member| {
                if member.player_name.is_empty() {
                    debug!(
                        content_id = %member.content_id,
                        "Content id didn't resolve to a player name, ignoring"
                    );
                }
                member.is_usable()
            })
            .collect();

        if mappings.is_empty() {
            return Dispatch::Dropped;
        }

        for mapping in &mappings {
            trace!(content_id = %mapping.content_id, name = %mapping.player_name, "Content id belongs to player");
        }
        self.ingestor.submit_mappings(mappings);
        Dispatch::Submitted
    }

    /// Take and queue a roster snapshot if the poll interval has elapsed
    ///
    /// `snapshot` is only called when a poll is due; otherwise the call is
    /// [`Dispatch::Ignored`].
    pub fn poll_roster<F>(&self, snapshot: F) -> Dispatch
    where
        F: FnOnce() -> Vec<ContentIdMapping>,
    {
        if !self.roster_throttle.should_poll() {
            return Dispatch::Ignored;
        }
        self.handle_roster(snapshot())
    }

    fn handle_market_board_payload(
        &self,
        payload: &[u8],
        current_world: Option<WorldId>,
    ) -> Dispatch {
        if current_world.map_or(true, |world| world.is_zero()) {
            info!("Skipping market board handler, current world unknown");
            return Dispatch::Dropped;
        }

        let Some(decoder) = &self.listing_decoder else {
            debug!("No listing decoder installed, dropping market board page");
            return Dispatch::Dropped;
        };

        match decoder.decode_listings(payload) {
            Ok(entries) => self.handle_market_board_offerings(current_world, entries),
            Err(e) => {
                debug!(error = %e, "Dropping undecodable market board page");
                Dispatch::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::codec::CONTENT_ID_MAPPING_SIZE;
    use crate::domain::ContentId;
    use crate::infra::{InMemoryRecordStore, ResolutionCache};

    const MARKET: u16 = 0x0200;

    async fn dispatcher() -> PacketDispatcher {
        let store = Arc::new(InMemoryRecordStore::new());
        let cache = Arc::new(ResolutionCache::new(store).await.unwrap());
        let ingestor = Ingestor::new(cache).unwrap();
        PacketDispatcher::new(
            ingestor,
            OpcodeTable::resolve(KNOWN_GAME_VERSION, None, Some(MARKET)),
        )
    }

    fn mapping_packet(content_id: u64, name: &str) -> Vec<u8> {
        let mut buf = vec![0u8; CONTENT_ID_MAPPING_SIZE];
        buf[..8].copy_from_slice(&content_id.to_le_bytes());
        buf[8..8 + name.len()].copy_from_slice(name.as_bytes());
        buf
    }

    #[test]
    fn test_opcode_table_known_version() {
        assert_eq!(
            OpcodeTable::for_game_version("2023.02.03.0000.0000"),
            Some(0x01C4)
        );
        assert_eq!(OpcodeTable::for_game_version("2023.03.24.0000.0000"), None);
    }

    #[test]
    fn test_opcode_override_wins() {
        let table = OpcodeTable::resolve(KNOWN_GAME_VERSION, Some(0x0123), None);
        assert_eq!(table.content_id_mapping, Some(0x0123));

        let unknown = OpcodeTable::resolve("1999.01.01.0000.0000", None, None);
        assert_eq!(unknown.content_id_mapping, None);

        let rescued = OpcodeTable::resolve("1999.01.01.0000.0000", Some(0x0321), None);
        assert_eq!(rescued.content_id_mapping, Some(0x0321));
    }

    #[tokio::test]
    async fn test_content_id_packet_is_ingested() {
        let dispatcher = dispatcher().await;

        let outcome = dispatcher.handle(
            CONTENT_ID_MAPPING_OPCODE,
            &mapping_packet(42, "Carl"),
            None,
        );
        assert_eq!(outcome, Dispatch::Submitted);

        let ingestor = dispatcher.ingestor();
        assert!(ingestor.wait_for_drain(Duration::from_secs(5)).await);
        assert_eq!(
            ingestor.cache().player_name(ContentId(42)),
            Some("Carl".to_string())
        );
    }

    #[tokio::test]
    async fn test_short_packet_is_dropped() {
        let dispatcher = dispatcher().await;

        let outcome = dispatcher.handle(CONTENT_ID_MAPPING_OPCODE, &[0u8; 12], None);

        assert_eq!(outcome, Dispatch::Dropped);
        assert_eq!(dispatcher.ingestor().total_submitted(), 0);
    }

    #[tokio::test]
    async fn test_untracked_opcode_is_ignored() {
        let dispatcher = dispatcher().await;
        assert_eq!(
            dispatcher.handle(0x0001, &mapping_packet(42, "Carl"), Some(WorldId(7))),
            Dispatch::Ignored
        );
    }

    #[tokio::test]
    async fn test_unknown_world_skips_market_board() {
        let dispatcher = dispatcher().await;
        let entries = vec![ListingEntry::new(100, Some("Bob"), 42)];

        assert_eq!(
            dispatcher.handle_market_board_offerings(None, entries.clone()),
            Dispatch::Dropped
        );
        assert_eq!(
            dispatcher.handle_market_board_offerings(Some(WorldId(0)), entries),
            Dispatch::Dropped
        );
        assert_eq!(dispatcher.ingestor().total_submitted(), 0);
    }

    #[tokio::test]
    async fn test_market_board_payload_uses_decoder() {
        let mut decoder = MockListingDecoder::new();
        decoder
            .expect_decode_listings()
            .times(1)
            .returning(|_| Ok(vec![ListingEntry::new(100, Some("Bob"), 42)]));

        let dispatcher = dispatcher().await.with_listing_decoder(Arc::new(decoder));

        assert_eq!(
            dispatcher.handle(MARKET, &[1, 2, 3], Some(WorldId(7))),
            Dispatch::Submitted
        );

        let ingestor = dispatcher.ingestor();
        assert!(ingestor.wait_for_drain(Duration::from_secs(5)).await);
        assert_eq!(
            ingestor.cache().owner_of(WorldId(7), "Bob"),
            Some(ContentId(42))
        );
    }

    #[tokio::test]
    async fn test_market_board_payload_unknown_world_never_decodes() {
        let mut decoder = MockListingDecoder::new();
        decoder.expect_decode_listings().never();

        let dispatcher = dispatcher().await.with_listing_decoder(Arc::new(decoder));

        assert_eq!(dispatcher.handle(MARKET, &[1, 2, 3], None), Dispatch::Dropped);
    }

    #[tokio::test]
    async fn test_social_list_page_is_ingested() {
        let dispatcher = dispatcher().await;
        let layout = SocialListLayout::default();
        let mut page = vec![0u8; layout.page_size()];
        let slot = layout.page_offset + 2 * layout.slot_size;
        page[slot..slot + 8].copy_from_slice(&43u64.to_le_bytes());
        page[slot + layout.name_offset..slot + layout.name_offset + 4].copy_from_slice(b"Dana");

        assert_eq!(dispatcher.handle_social_list_page(&page), Dispatch::Submitted);

        let ingestor = dispatcher.ingestor();
        assert!(ingestor.wait_for_drain(Duration::from_secs(5)).await);
        assert_eq!(
            ingestor.cache().player_name(ContentId(43)),
            Some("Dana".to_string())
        );
    }

    #[tokio::test]
    async fn test_short_social_list_page_is_dropped() {
        let dispatcher = dispatcher().await;
        assert_eq!(
            dispatcher.handle_social_list_page(&[0u8; 16]),
            Dispatch::Dropped
        );
    }

    #[tokio::test]
    async fn test_roster_without_usable_members_is_not_submitted() {
        let dispatcher = dispatcher().await;

        let outcome = dispatcher.handle_roster(vec![
            ContentIdMapping::new(0, "Nobody"),
            ContentIdMapping::new(44, ""),
        ]);

        assert_eq!(outcome, Dispatch::Dropped);
        assert_eq!(dispatcher.ingestor().total_submitted(), 0);
    }

    #[test]
    fn test_roster_throttle() {
        let throttle = RosterThrottle::default();
        assert!(throttle.should_poll());
        assert!(!throttle.should_poll());

        let eager = RosterThrottle::new(Duration::ZERO);
        assert!(eager.should_poll());
        assert!(eager.should_poll());
    }

    #[tokio::test]
    async fn test_roster_poll_is_throttled() {
        let dispatcher = dispatcher().await;

        let first = dispatcher.poll_roster(|| vec![ContentIdMapping::new(45, "Finn")]);
        assert_eq!(first, Dispatch::Submitted);

        let second = dispatcher.poll_roster(|| -> Vec<ContentIdMapping> {
            panic!("snapshot taken inside the poll interval")
        });
        assert_eq!(second, Dispatch::Ignored);

        let ingestor = dispatcher.ingestor();
        assert!(ingestor.wait_for_drain(Duration::from_secs(5)).await);
        assert_eq!(ingestor.total_submitted(), 1);
        assert_eq!(
            ingestor.cache().player_name(ContentId(45)),
            Some("Finn".to_string())
        );
    }

    #[tokio::test]
    async fn test_roster_interval_is_configurable() {
        let dispatcher = dispatcher().await.with_roster_interval(Duration::ZERO);

        for id in [46, 47] {
            assert_eq!(
                dispatcher.poll_roster(|| vec![ContentIdMapping::new(id, "Gus")]),
                Dispatch::Submitted
            );
        }
        assert_eq!(dispatcher.ingestor().total_submitted(), 2);
    }

    #[tokio::test]
    async fn test_market_board_decode_error_is_dropped() {
        let mut decoder = MockListingDecoder::new();
        decoder.expect_decode_listings().returning(|payload| {
            Err(DecodeError::TooShort {
                expected: 64,
                actual: payload.len(),
            })
        });

        let dispatcher = dispatcher().await.with_listing_decoder(Arc::new(decoder));

        assert_eq!(
            dispatcher.handle(MARKET, &[1, 2, 3], Some(WorldId(7))),
            Dispatch::Dropped
        );
        assert_eq!(dispatcher.ingestor().total_submitted(), 0);
    }
}
