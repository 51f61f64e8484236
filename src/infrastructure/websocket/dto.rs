use serde::{Deserialize, Serialize};

use crate::domain::errors::InfrastructureError;
use crate::domain::market_data::{Symbol, Tick};

pub const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws";

/// DTO для сделки Binance (`<symbol>@trade`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BinanceTradeData {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "T")]
    pub trade_time: u64,
}

impl BinanceTradeData {
    /// Конвертирует DTO в доменный тик
    pub fn to_domain_tick(&self) -> Result<Tick, InfrastructureError> {
        let symbol = Symbol::new(&self.symbol)
            .map_err(|e| InfrastructureError::Parse(format!("trade {}: {e}", self.trade_id)))?;
        let price = self.price.parse::<f64>().map_err(|e| {
            InfrastructureError::Parse(format!("trade {} price '{}': {e}", self.trade_id, self.price))
        })?;
        Ok(Tick::new(symbol, price, self.trade_time))
    }
}

/// Single-stream payloads arrive bare, combined-stream payloads are wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamEnvelope {
    Combined {
        #[allow(dead_code)]
        stream: String,
        data: BinanceTradeData,
    },
    Raw(BinanceTradeData),
    Ack(BinanceSubscriptionResponse),
}

/// Parse one websocket text frame. Subscription acknowledgements yield `None`.
pub fn parse_stream_message(text: &str) -> Result<Option<Tick>, InfrastructureError> {
    let envelope: StreamEnvelope = serde_json::from_str(text)
        .map_err(|e| InfrastructureError::Parse(format!("Failed to parse Binance message: {e}")))?;
    match envelope {
        StreamEnvelope::Combined { data, .. } | StreamEnvelope::Raw(data) => data.to_domain_tick().map(Some),
        StreamEnvelope::Ack(_) => Ok(None),
    }
}

pub fn trade_stream_name(symbol: &Symbol) -> String {
    format!("{}@trade", symbol.value().to_lowercase())
}

/// DTO для подписки на WebSocket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinanceSubscription {
    pub method: String,
    pub params: Vec<String>,
    pub id: u64,
}

impl BinanceSubscription {
    pub fn subscribe(symbol: &Symbol, id: u64) -> Self {
        Self { method: "SUBSCRIBE".to_string(), params: vec![trade_stream_name(symbol)], id }
    }

    pub fn unsubscribe(symbol: &Symbol, id: u64) -> Self {
        Self { method: "UNSUBSCRIBE".to_string(), params: vec![trade_stream_name(symbol)], id }
    }

    pub fn to_json(&self) -> Result<String, InfrastructureError> {
        serde_json::to_string(self).map_err(|e| InfrastructureError::Parse(e.to_string()))
    }
}

/// DTO для ответа на подписку
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BinanceSubscriptionResponse {
    pub result: Option<serde_json::Value>,
    pub id: u64,
}
