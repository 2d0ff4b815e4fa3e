use async_trait::async_trait;

use crate::error::BusError;

/// Publish/subscribe client the bridge talks through (an MQTT client in deployment).
///
/// The client owns its event loop; it calls [`BusBridge::on_connect`](crate::BusBridge::on_connect)
/// after every (re)connection and [`BusBridge::on_message`](crate::BusBridge::on_message)
/// for every message on a subscribed topic.
#[async_trait]
pub trait BusClient: Send + Sync + 'static {
    /// Publishes `payload` on `topic`.
    async fn publish(&self, topic: &str, payload: &[u8], retained: bool) -> Result<(), BusError>;

    /// Subscribes to an exact topic.
    async fn subscribe(&self, topic: &str) -> Result<(), BusError>;
}

/// Message the broker publishes on our behalf when the client drops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastWill {
    pub topic: String,
    pub payload: &'static str,
    pub retained: bool,
}
