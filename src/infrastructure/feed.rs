use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Symbol, UpstreamFeed};
use crate::log_warn;

/// Instruction for the transport task owning the actual connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    Open(Symbol),
    Close(Symbol),
}

/// [`UpstreamFeed`] that forwards open/close requests over a channel.
///
/// Never blocks the caller; the transport drains the receiver at its own pace.
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    commands: UnboundedSender<FeedCommand>,
}

impl ChannelFeed {
    pub fn new() -> (Self, UnboundedReceiver<FeedCommand>) {
        let (commands, receiver) = unbounded();
        (Self { commands }, receiver)
    }

    fn send(&self, command: FeedCommand) {
        if let Err(e) = self.commands.unbounded_send(command) {
            log_warn!(
                LogComponent::Infrastructure("ChannelFeed"),
                "Transport gone, dropped {:?}",
                e.into_inner()
            );
        }
    }
}

impl UpstreamFeed for ChannelFeed {
    fn open(&mut self, symbol: &Symbol) {
        self.send(FeedCommand::Open(symbol.clone()));
    }

    fn close(&mut self, symbol: &Symbol) {
        self.send(FeedCommand::Close(symbol.clone()));
    }
}
