mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Call, MockTransport, RecordingClient, address, config, descriptor, eventually};
use fleetvisor::{Action, BusBridge, Fleet, InboundError};

async fn setup(transport: &MockTransport) -> (Arc<Fleet>, Arc<BusBridge>, Arc<RecordingClient>) {
    let client = Arc::new(RecordingClient::default());
    let bridge = Arc::new(BusBridge::new(client.clone(), "tesla-ble"));
    let fleet = Fleet::builder(config(), Arc::new(transport.clone()))
        .with_status_sink(bridge.clone())
        .build();

    let car = fleet.add_device(descriptor("model3")).await.unwrap();
    bridge.attach(car, 16).await;
    bridge.on_connect().await.unwrap();
    (fleet, bridge, client)
}

#[tokio::test(start_paused = true)]
async fn bus_command_reaches_the_vehicle_and_is_echoed() {
    let transport = MockTransport::new();
    let (fleet, bridge, client) = setup(&transport).await;

    assert_eq!(
        client.subscribed(),
        [
            "tesla-ble/model3/charging_amps_set",
            "tesla-ble/model3/charging_set"
        ]
    );
    assert_eq!(client.published_on("tesla-ble/status"), ["online"]);

    bridge
        .on_message("tesla-ble/model3/charging_amps_set", b"12.4")
        .await
        .unwrap();
    eventually(|| !client.published_on("tesla-ble/model3/charging_amps").is_empty()).await;

    assert_eq!(client.published_on("tesla-ble/model3/charging_amps"), ["12"]);
    assert!(
        transport
            .calls()
            .contains(&Call::Execute(address("model3"), Action::SetChargingAmps(12)))
    );
    assert_eq!(
        client
            .published_on("tesla-ble/model3/status")
            .last()
            .map(String::as_str),
        Some("online")
    );

    fleet.stop().await.unwrap();
    assert_eq!(
        client
            .published_on("tesla-ble/model3/status")
            .last()
            .map(String::as_str),
        Some("offline")
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_command_is_reported_on_the_bus() {
    let transport = MockTransport::new();
    transport.reject_action("start_charging");
    let (fleet, bridge, client) = setup(&transport).await;

    bridge
        .on_message("tesla-ble/model3/charging_set", b"ON")
        .await
        .unwrap();
    eventually(|| !client.published_on("tesla-ble/model3/command_failed").is_empty()).await;

    let reports = client.published_on("tesla-ble/model3/command_failed");
    assert_eq!(reports.len(), 1);
    let report: serde_json::Value = serde_json::from_str(&reports[0]).unwrap();
    assert_eq!(report["command"], "start_charging");
    assert_eq!(report["attempts"], 2);
    assert_eq!(report["error"], "action rejected: vehicle busy");

    assert!(client.published_on("tesla-ble/model3/charging").is_empty());
    assert_eq!(
        transport.count(|c| *c == Call::Execute(address("model3"), Action::StartCharging)),
        2
    );
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn invalid_messages_never_touch_the_vehicle() {
    let transport = MockTransport::new();
    let (fleet, bridge, _client) = setup(&transport).await;

    assert!(matches!(
        bridge
            .on_message("tesla-ble/model3/charging_amps_set", b"40")
            .await,
        Err(InboundError::InvalidPayload { .. })
    ));
    assert!(matches!(
        bridge.on_message("tesla-ble/other/charging_set", b"ON").await,
        Err(InboundError::UnknownTopic(_))
    ));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(transport.calls().is_empty());
    fleet.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn removed_device_rejects_bus_commands() {
    let transport = MockTransport::new();
    let (fleet, bridge, _client) = setup(&transport).await;

    fleet.remove_device("model3").await.unwrap();
    assert!(matches!(
        bridge
            .on_message("tesla-ble/model3/charging_set", b"OFF")
            .await,
        Err(InboundError::Queue(_))
    ));

    bridge.detach("model3").await;
    assert!(matches!(
        bridge
            .on_message("tesla-ble/model3/charging_set", b"OFF")
            .await,
        Err(InboundError::UnknownTopic(_))
    ));
    fleet.stop().await.unwrap();
}
