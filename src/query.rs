//! World-aware query facade
//!
//! Display code only knows a retainer name; the world comes from the player's
//! current location. [`RetainerNameResolver`] binds the two and answers
//! nothing at all while the world is unknown.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use crate::domain::WorldId;
use crate::infra::ResolutionCache;

/// Source of the player's current world
pub trait WorldContext: Send + Sync {
    /// Current world, `None` while unknown (logged out, loading)
    fn current_world(&self) -> Option<WorldId>;
}

impl<F> WorldContext for F
where
    F: Fn() -> Option<WorldId> + Send + Sync,
{
    fn current_world(&self) -> Option<WorldId> {
        self()
    }
}

/// Current world kept up to date by the host
///
/// World 0 doubles as "unknown".
#[derive(Debug, Default)]
pub struct CurrentWorld {
    id: AtomicU16,
}

impl CurrentWorld {
    pub fn new(world: Option<WorldId>) -> Self {
        let current = Self::default();
        current.set(world);
        current
    }

    pub fn set(&self, world: Option<WorldId>) {
        let id = world.map_or(0, |w| w.as_u16());
        self.id.store(id, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.set(None);
    }
}

impl WorldContext for CurrentWorld {
    fn current_world(&self) -> Option<WorldId> {
        let world = WorldId::new(self.id.load(Ordering::Relaxed));
        (!world.is_zero()).then_some(world)
    }
}

/// Label shown for a retainer whose owner is known
pub fn annotate_retainer_name(retainer_name: &str, player_name: &str) -> String {
    format!("{player_name} ({retainer_name})")
}

/// Resolves retainer names on the player's current world
#[derive(Clone)]
pub struct RetainerNameResolver {
    cache: Arc<ResolutionCache>,
    world: Arc<dyn WorldContext>,
}

impl RetainerNameResolver {
    pub fn new(cache: Arc<ResolutionCache>, world: Arc<dyn WorldContext>) -> Self {
        Self { cache, world }
    }

    /// Owner's player name for `retainer_name` on the current world
    pub fn character_name_on_current_world(&self, retainer_name: &str) -> Option<String> {
        let world = self.world.current_world().filter(|w| !w.is_zero())?;
        self.cache.resolve(world, retainer_name)
    }

    /// Annotated label for `retainer_name`, or `None` to leave it as is
    pub fn annotate(&self, retainer_name: &str) -> Option<String> {
        // already annotated
        if retainer_name.contains('(') {
            return None;
        }

        self.character_name_on_current_world(retainer_name)
            .map(|player_name| annotate_retainer_name(retainer_name, &player_name))
    }
}
