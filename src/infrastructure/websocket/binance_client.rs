use std::collections::BTreeSet;
use std::time::Duration;

use futures::channel::mpsc::UnboundedReceiver;
use futures::future::ready;
use futures::stream::{self, SplitSink};
use futures::{SinkExt, StreamExt};
use gloo_net::websocket::Message;
use gloo_net::websocket::futures::WebSocket;
use gloo_timers::future::sleep;

use super::dto::{BINANCE_WS_URL, BinanceSubscription, parse_stream_message};
use crate::domain::errors::{InfrastructureError, NetworkError};
use crate::domain::logging::{LogComponent, get_logger};
use crate::domain::market_data::{Symbol, Tick};
use crate::infrastructure::feed::FeedCommand;

const MAX_BACKOFF_SECS: u64 = 32;

enum StreamEvent {
    Command(FeedCommand),
    Message(Result<Message, gloo_net::websocket::WebSocketError>),
    Closed,
    CommandsClosed,
}

/// Binance trade stream client on one multiplexed socket.
///
/// Symbols are added and removed with SUBSCRIBE/UNSUBSCRIBE requests as
/// [`FeedCommand`]s arrive; after a drop the client reconnects with
/// exponential backoff and resubscribes everything it was asked to watch.
pub struct BinanceTradeClient {
    url: String,
    subscribed: BTreeSet<Symbol>,
    next_request_id: u64,
}

impl Default for BinanceTradeClient {
    fn default() -> Self {
        Self::new(BINANCE_WS_URL)
    }
}

impl BinanceTradeClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), subscribed: BTreeSet::new(), next_request_id: 1 }
    }

    fn connect(&self) -> Result<WebSocket, InfrastructureError> {
        get_logger().info(
            LogComponent::Infrastructure("BinanceWS"),
            &format!("🔌 Connecting to Binance: {}", self.url),
        );
        WebSocket::open(&self.url)
            .map_err(|e| NetworkError::WebSocketConnectionFailed(format!("{e:?}")).into())
    }

    async fn send(
        &mut self,
        sink: &mut SplitSink<WebSocket, Message>,
        request: BinanceSubscription,
    ) -> Result<(), InfrastructureError> {
        self.next_request_id += 1;
        let json = request.to_json()?;
        sink.send(Message::Text(json))
            .await
            .map_err(|e| NetworkError::TransportClosed(format!("{e:?}")).into())
    }

    /// Run until `commands` is closed. Never returns early on transport errors.
    pub async fn run<T, S>(
        mut self,
        mut commands: UnboundedReceiver<FeedCommand>,
        mut on_tick: T,
        mut on_status: S,
    ) where
        T: FnMut(Tick),
        S: FnMut(&Symbol, bool),
    {
        let mut delay = 1u64;
        let mut commands_open = true;
        while commands_open {
            let ws = match self.connect() {
                Ok(ws) => ws,
                Err(e) => {
                    get_logger().error(LogComponent::Infrastructure("BinanceWS"), &format!("❌ {e}"));
                    sleep(Duration::from_secs(delay)).await;
                    delay = (delay * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }
            };
            let (mut sink, read) = ws.split();

            let mut healthy = true;
            for symbol in self.subscribed.clone() {
                let request = BinanceSubscription::subscribe(&symbol, self.next_request_id);
                if self.send(&mut sink, request).await.is_err() {
                    healthy = false;
                    break;
                }
                on_status(&symbol, true);
            }

            let incoming = read.map(StreamEvent::Message).chain(stream::once(ready(StreamEvent::Closed)));
            let control = commands
                .by_ref()
                .map(StreamEvent::Command)
                .chain(stream::once(ready(StreamEvent::CommandsClosed)));
            let mut events = stream::select(control, incoming);

            while healthy {
                let Some(event) = events.next().await else {
                    commands_open = false;
                    break;
                };
                match event {
                    StreamEvent::Command(FeedCommand::Open(symbol)) => {
                        if self.subscribed.insert(symbol.clone()) {
                            let request = BinanceSubscription::subscribe(&symbol, self.next_request_id);
                            healthy = self.send(&mut sink, request).await.is_ok();
                        }
                    }
                    StreamEvent::Command(FeedCommand::Close(symbol)) => {
                        if self.subscribed.remove(&symbol) {
                            let request = BinanceSubscription::unsubscribe(&symbol, self.next_request_id);
                            healthy = self.send(&mut sink, request).await.is_ok();
                        }
                    }
                    StreamEvent::Message(Ok(Message::Text(text))) => match parse_stream_message(&text) {
                        Ok(Some(tick)) => {
                            delay = 1;
                            on_tick(tick);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            get_logger().warn(LogComponent::Infrastructure("BinanceWS"), &e.to_string())
                        }
                    },
                    StreamEvent::Message(Ok(Message::Bytes(_))) => {}
                    StreamEvent::Message(Err(e)) => {
                        get_logger().error(
                            LogComponent::Infrastructure("BinanceWS"),
                            &format!("❌ WebSocket error: {e:?}"),
                        );
                        healthy = false;
                    }
                    StreamEvent::Closed => healthy = false,
                    StreamEvent::CommandsClosed => {
                        commands_open = false;
                        break;
                    }
                }
            }
            drop(events);

            for symbol in &self.subscribed {
                on_status(symbol, false);
            }
            if !commands_open {
                break;
            }
            get_logger().warn(
                LogComponent::Infrastructure("BinanceWS"),
                &format!("🔌 Reconnecting in {delay}s"),
            );
            sleep(Duration::from_secs(delay)).await;
            delay = (delay * 2).min(MAX_BACKOFF_SECS);
        }
        get_logger().info(LogComponent::Infrastructure("BinanceWS"), "Feed command channel closed, stopping");
    }
}
