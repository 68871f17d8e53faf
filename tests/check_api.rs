#![allow(dead_code)]

use beacon_broadcast::*;
use futures_lite::StreamExt;

fn assert_send<T: Send>(t: T) -> T {
    t
}

async fn check_beacon_apis(beacon: Beacon) -> Result<()> {
    let descriptor = BeaconDescriptor::new(Uuid::nil());
    let _frame: Result<AdvertisingFrame> = AdvertisingFrame::from_descriptor(&descriptor);
    let _layout: Result<BeaconLayout> = BeaconLayout::parse(defaults::LAYOUT);
    let _mode: AdvertiseMode = descriptor.advertise_mode();

    let _res: Result<()> = beacon.start(&descriptor);
    let _res: Result<()> = beacon.start_with_listener(&descriptor, |_advertising: bool| {});
    let _advertising: bool = beacon.is_advertising();
    let _support: TransmissionSupport = beacon.check_support();
    let _code: u8 = beacon.check_support().status_code();

    let mut events = assert_send(beacon.advertising_events());
    let _event: Option<bool> = assert_send(events.next()).await;

    beacon.stop();
    Ok(())
}

async fn check_bridge_apis(beacon: Beacon) -> Result<()> {
    let call = bridge::MethodCall::new("isAdvertising");
    let _value: serde_json::Value = bridge::dispatch(&beacon, &call)?;
    Ok(())
}

async fn check_construction() {
    let beacon: Beacon = assert_send(Beacon::new()).await;
    let _ = check_beacon_apis(beacon).await;
}

// Holds everywhere: with no radio the start path is never entered, and with
// one nothing was started; stop still owes its terminal notification.
#[tokio::test]
async fn stop_notifies_false_without_a_prior_start() {
    let beacon = Beacon::new().await;
    let mut events = beacon.advertising_events();

    beacon.stop();
    assert_eq!(events.next().await, Some(false));
    assert!(!beacon.is_advertising());
}
