//! Property tests for state clamping and mirror updates.

use camlink::state::{BATTERY_MAX, BATTERY_MIN, TEMP_MAX, TEMP_MIN, ZOOM_MAX, ZOOM_MIN};
use camlink::{DeviceStateStore, MirrorState, TelemetryUpdate};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_zoom_always_lands_in_range(zoom in -1000.0f32..1000.0) {
        let mut store = DeviceStateStore::new();
        let applied = store.set_zoom(zoom);
        prop_assert!((ZOOM_MIN..=ZOOM_MAX).contains(&applied));
        // In-range requests apply exactly.
        if (ZOOM_MIN..=ZOOM_MAX).contains(&zoom) {
            prop_assert_eq!(applied, zoom);
        }
    }

    #[test]
    fn prop_battery_and_temperature_land_in_range(
        battery in -500.0f32..500.0,
        temperature in -500.0f32..500.0,
    ) {
        let mut store = DeviceStateStore::new();
        let battery = store.set_battery_level(battery);
        let temperature = store.set_temperature(temperature);
        prop_assert!((BATTERY_MIN..=BATTERY_MAX).contains(&battery));
        prop_assert!((TEMP_MIN..=TEMP_MAX).contains(&temperature));
    }

    #[test]
    fn prop_partial_telemetry_only_touches_named_fields(
        battery in proptest::option::of(0.0f32..100.0),
        temperature in proptest::option::of(65.0f32..95.0),
        signal in proptest::option::of(0u8..=100),
        is_recording in proptest::option::of(any::<bool>()),
        duration in proptest::option::of(0u64..100_000),
    ) {
        let update = TelemetryUpdate {
            battery_level: battery,
            temperature,
            storage: None,
            signal,
            is_recording,
            recording_duration: duration,
        };
        let mut mirror = MirrorState::default();
        let before = mirror.clone();
        mirror.apply_telemetry(&update, 1);

        prop_assert_eq!(mirror.battery_level, battery.unwrap_or(before.battery_level));
        prop_assert_eq!(mirror.temperature, temperature.unwrap_or(before.temperature));
        prop_assert_eq!(mirror.signal, signal.unwrap_or(before.signal));
        prop_assert_eq!(mirror.is_recording, is_recording.unwrap_or(before.is_recording));
        prop_assert_eq!(
            mirror.recording_duration,
            duration.unwrap_or(before.recording_duration)
        );
        // Fields a telemetry update can never carry stay put.
        prop_assert_eq!(mirror.zoom, before.zoom);
        prop_assert_eq!(mirror.quality, before.quality);
        prop_assert_eq!(&mirror.storage, &before.storage);
    }

    #[test]
    fn prop_command_messages_round_trip(zoom in -10.0f32..10.0, rate in 1u32..240) {
        use camlink::{Command, Message};
        for command in [
            Command::SetZoom { zoom },
            Command::SetFramerate { frame_rate: rate },
        ] {
            let msg = Message::Command { command: command.clone(), timestamp: 7 };
            let decoded = Message::decode(&msg.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, Message::Command { command, timestamp: 7 });
        }
    }
}
