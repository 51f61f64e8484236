use hecs::World;

use super::components::RenderComponent;
use crate::application::render_coordinator::DrawingSink;

/// Poll every display and hand due frames to `sink`. Returns frames drawn.
pub fn render_due_displays<S: DrawingSink + ?Sized>(world: &mut World, now: u64, sink: &mut S) -> usize {
    world
        .query_mut::<&mut RenderComponent>()
        .into_iter()
        .map(|(_, render)| render.0.render_to(now, &mut *sink))
        .filter(|drawn| *drawn)
        .count()
}
