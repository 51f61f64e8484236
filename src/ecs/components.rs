use crate::application::render_coordinator::RenderCoordinator;
use crate::application::subscription_registry::SubscriptionHandle;
use crate::domain::chart::DisplayId;

/// ECS component identifying an open display.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayComponent(pub DisplayId);

/// ECS component holding the display's subscription to its symbol.
#[derive(Debug)]
pub struct SubscriptionComponent(pub SubscriptionHandle);

/// ECS component driving the display's frames.
#[derive(Debug)]
pub struct RenderComponent(pub RenderCoordinator);
