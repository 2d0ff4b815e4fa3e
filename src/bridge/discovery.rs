//! Home Assistant discovery payloads.
//!
//! Published retained on every bus connection, one per entity:
//!
//! ```text
//! <discovery_prefix>/number/<prefix>_<id>/charging_amps/config
//! <discovery_prefix>/switch/<prefix>_<id>/charging/config
//! <discovery_prefix>/binary_sensor/<prefix>_<id>/connectivity/config
//! ```
//!
//! Entities use the bridge status topic for availability: a device that is merely
//! asleep must still accept commands.

use serde::Serialize;

use crate::bridge::topics::{
    CHARGING, CHARGING_AMPS, CHARGING_AMPS_SET, CHARGING_SET, STATUS, Topics,
};
use crate::core::Connectivity;

/// Abbreviated discovery schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityConfig {
    #[serde(rename = "dev_cla", skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(rename = "unit_of_meas", skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    pub name: &'static str,
    #[serde(rename = "stat_t")]
    pub state_topic: String,
    #[serde(rename = "cmd_t", skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(rename = "avty_t")]
    pub availability_topic: String,
    #[serde(rename = "uniq_id")]
    pub unique_id: String,
    #[serde(rename = "dev")]
    pub device: EntityDevice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
    #[serde(rename = "pl_on", skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(rename = "pl_off", skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityDevice {
    pub ids: String,
    pub name: String,
}

/// A discovery publication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryMessage {
    pub topic: String,
    pub payload: String,
}

/// Builds the discovery messages of one device.
pub fn device_discovery(
    topics: &Topics,
    discovery_prefix: &str,
    id: &str,
    max_charging_amps: i32,
) -> Result<Vec<DiscoveryMessage>, serde_json::Error> {
    let node = format!("{}_{id}", topics.prefix());
    let device = EntityDevice {
        ids: node.clone(),
        name: id.to_string(),
    };
    let availability = topics.bridge_status();

    let amps = EntityConfig {
        device_class: Some("current"),
        unit_of_measurement: Some("A"),
        name: CHARGING_AMPS,
        state_topic: topics.device(id, CHARGING_AMPS),
        command_topic: Some(topics.device(id, CHARGING_AMPS_SET)),
        availability_topic: availability.clone(),
        unique_id: topics.device(id, CHARGING_AMPS),
        device: device.clone(),
        min: Some(0),
        max: Some(max_charging_amps),
        payload_on: None,
        payload_off: None,
    };
    let charging = EntityConfig {
        device_class: Some("switch"),
        unit_of_measurement: None,
        name: CHARGING,
        state_topic: topics.device(id, CHARGING),
        command_topic: Some(topics.device(id, CHARGING_SET)),
        availability_topic: availability.clone(),
        unique_id: topics.device(id, CHARGING),
        device: device.clone(),
        min: None,
        max: None,
        payload_on: Some("ON"),
        payload_off: Some("OFF"),
    };
    let connectivity = EntityConfig {
        device_class: Some("connectivity"),
        unit_of_measurement: None,
        name: "connectivity",
        state_topic: topics.device(id, STATUS),
        command_topic: None,
        availability_topic: availability,
        unique_id: topics.device(id, STATUS),
        device,
        min: None,
        max: None,
        payload_on: Some(Connectivity::Online.as_str()),
        payload_off: Some(Connectivity::Offline.as_str()),
    };

    [
        ("number", amps),
        ("switch", charging),
        ("binary_sensor", connectivity),
    ]
    .into_iter()
    .map(|(component, entity)| {
        Ok(DiscoveryMessage {
            topic: format!("{discovery_prefix}/{component}/{node}/{}/config", entity.name),
            payload: serde_json::to_string(&entity)?,
        })
    })
    .collect()
}
