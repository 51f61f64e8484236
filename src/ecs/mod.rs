use std::collections::HashMap;

use hecs::{Entity, World};

use crate::application::render_coordinator::RenderCoordinator;
use crate::application::subscription_registry::SubscriptionHandle;
use crate::domain::chart::DisplayId;
use crate::domain::errors::CoordinationError;
use crate::domain::market_data::Symbol;

pub mod components;
pub mod systems;

use components::{DisplayComponent, RenderComponent, SubscriptionComponent};

/// World of open displays, one entity per display.
#[derive(Default)]
pub struct EcsWorld {
    pub world: World,
    displays: HashMap<DisplayId, Entity>,
}

impl EcsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &DisplayId) -> bool {
        self.displays.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    pub fn display_ids(&self) -> Vec<DisplayId> {
        let mut ids: Vec<DisplayId> = self.displays.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Spawn a display entity with its subscription and render coordinator.
    pub fn spawn_display(
        &mut self,
        handle: SubscriptionHandle,
        render: RenderCoordinator,
    ) -> Result<Entity, CoordinationError> {
        let id = render.display_id().clone();
        if self.displays.contains_key(&id) {
            return Err(CoordinationError::DuplicateDisplay(id));
        }
        let entity = self.world.spawn((
            DisplayComponent(id.clone()),
            SubscriptionComponent(handle),
            RenderComponent(render),
        ));
        self.displays.insert(id, entity);
        Ok(entity)
    }

    /// Remove a display, returning its subscription and coordinator.
    pub fn despawn_display(
        &mut self,
        id: &DisplayId,
    ) -> Result<(SubscriptionHandle, RenderCoordinator), CoordinationError> {
        let entity = self.displays.remove(id).ok_or_else(|| CoordinationError::UnknownDisplay(id.clone()))?;
        let (subscription, render) = self
            .world
            .remove::<(SubscriptionComponent, RenderComponent)>(entity)
            .map_err(|_| CoordinationError::UnknownDisplay(id.clone()))?;
        let _ = self.world.despawn(entity);
        Ok((subscription.0, render.0))
    }

    pub fn symbol_of(&self, id: &DisplayId) -> Option<Symbol> {
        let entity = *self.displays.get(id)?;
        let render = self.world.get::<&RenderComponent>(entity).ok()?;
        Some(render.0.symbol().clone())
    }

    pub fn render_mut(&mut self, id: &DisplayId) -> Result<&mut RenderCoordinator, CoordinationError> {
        let entity = *self.displays.get(id).ok_or_else(|| CoordinationError::UnknownDisplay(id.clone()))?;
        self.world
            .query_one_mut::<&mut RenderComponent>(entity)
            .map(|render| &mut render.0)
            .map_err(|_| CoordinationError::UnknownDisplay(id.clone()))
    }

    /// Swap the display's subscription, returning the previous one.
    pub fn replace_subscription(
        &mut self,
        id: &DisplayId,
        handle: SubscriptionHandle,
    ) -> Result<SubscriptionHandle, CoordinationError> {
        let entity = *self.displays.get(id).ok_or_else(|| CoordinationError::UnknownDisplay(id.clone()))?;
        let slot = self
            .world
            .query_one_mut::<&mut SubscriptionComponent>(entity)
            .map_err(|_| CoordinationError::UnknownDisplay(id.clone()))?;
        Ok(std::mem::replace(&mut slot.0, handle))
    }
}
