use crate::domain::chart::{CanvasGeometry, DisplayId};
use crate::domain::market_data::{Symbol, SymbolState, TickRejection};
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;

/// Base trait for all domain events
pub trait DomainEvent: Debug + Clone {
    fn event_type(&self) -> &'static str;
    fn timestamp(&self) -> u64 {
        use crate::domain::logging::get_time_provider;
        get_time_provider().current_timestamp()
    }
}

/// Events related to market data
#[derive(Debug, Clone)]
pub enum MarketDataEvent {
    SnapshotPublished { snapshot: Arc<SymbolState> },
    SessionReset { snapshot: Arc<SymbolState> },
    TickRejected { rejection: TickRejection },
    FeedStatusChanged { symbol: Symbol, connected: bool },
    SymbolEvicted { symbol: Symbol },
}

impl DomainEvent for MarketDataEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MarketDataEvent::SnapshotPublished { .. } => "SnapshotPublished",
            MarketDataEvent::SessionReset { .. } => "SessionReset",
            MarketDataEvent::TickRejected { .. } => "TickRejected",
            MarketDataEvent::FeedStatusChanged { .. } => "FeedStatusChanged",
            MarketDataEvent::SymbolEvicted { .. } => "SymbolEvicted",
        }
    }
}

/// Events related to display lifecycle
#[derive(Debug, Clone)]
pub enum ChartEvent {
    DisplayOpened { display_id: DisplayId, symbol: Symbol },
    DisplayResized { display_id: DisplayId, geometry: CanvasGeometry },
    DisplaySymbolChanged { display_id: DisplayId, from: Symbol, to: Symbol },
    DisplayClosed { display_id: DisplayId },
}

impl DomainEvent for ChartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChartEvent::DisplayOpened { .. } => "DisplayOpened",
            ChartEvent::DisplayResized { .. } => "DisplayResized",
            ChartEvent::DisplaySymbolChanged { .. } => "DisplaySymbolChanged",
            ChartEvent::DisplayClosed { .. } => "DisplayClosed",
        }
    }
}

/// Event dispatcher for publishing events
pub trait EventDispatcher<E: DomainEvent> {
    fn publish(&self, event: E);
}

type Handler<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Simple in-memory event dispatcher.
///
/// Handlers run synchronously on the publishing thread and must not block or
/// register further handlers.
pub struct InMemoryEventDispatcher<E> {
    handlers: RwLock<Vec<Handler<E>>>,
}

impl<E> InMemoryEventDispatcher<E> {
    pub fn new() -> Self {
        Self { handlers: RwLock::new(Vec::new()) }
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.handlers.write().push(Box::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl<E> Default for InMemoryEventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DomainEvent> EventDispatcher<E> for InMemoryEventDispatcher<E> {
    fn publish(&self, event: E) {
        for handler in self.handlers.read().iter() {
            handler(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dispatcher_fans_out_to_every_handler() {
        let dispatcher = InMemoryEventDispatcher::<MarketDataEvent>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(move |event| {
                if event.event_type() == "SymbolEvicted" {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        dispatcher.publish(MarketDataEvent::SymbolEvicted { symbol: Symbol::from("BTCUSDT") });
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.handler_count(), 3);
    }
}
