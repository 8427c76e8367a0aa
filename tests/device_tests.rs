use std::sync::{Arc, Mutex};
use std::time::Duration;

use pico_climate::{
    ClimateDevice, CommandFormat, DeviceState, FanMode, HvacMode, MessageLogMode, StateSnapshot,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn device_addr(server: &MockServer) -> String {
    let addr = server.address();
    format!("{}:{}", addr.ip(), addr.port())
}

async fn mount_state_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(server)
        .await;
}

async fn keyed_device(server: &MockServer) -> ClimateDevice {
    mount_state_ok(server).await;
    ClimateDevice::builder("living_room", "Living Room", device_addr(server))
        .api_key("ABC")
        .build()
        .expect("device should build")
}

async fn requests(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.expect("recording enabled")
}

fn query_value(req: &Request, key: &str) -> Option<String> {
    req.url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn set_hvac_mode_sends_one_request_per_call() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    for mode in HvacMode::SUPPORTED {
        device.set_hvac_mode(mode).await.unwrap();
        assert_eq!(device.state().hvac_mode, mode);
    }

    let received = requests(&server).await;
    assert_eq!(received.len(), HvacMode::SUPPORTED.len());
    for (req, mode) in received.iter().zip(HvacMode::SUPPORTED) {
        assert_eq!(query_value(req, "mode").as_deref(), Some(mode.as_str()));
    }
}

#[tokio::test]
async fn set_fan_mode_sends_one_request_per_call() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    for fan in FanMode::SUPPORTED {
        device.set_fan_mode(fan).await.unwrap();
        assert_eq!(device.state().fan_mode, fan);
    }

    let received = requests(&server).await;
    assert_eq!(received.len(), FanMode::SUPPORTED.len());
    for (req, fan) in received.iter().zip(FanMode::SUPPORTED) {
        assert_eq!(query_value(req, "fan"), Some(fan.to_string()));
    }
}

#[tokio::test]
async fn set_temperature_mirrors_current() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    for t in pico_climate::MIN_TEMP..=pico_climate::MAX_TEMP {
        device.set_temperature(t).await;
        assert_eq!(device.state().target_temperature, t);
        assert_eq!(device.state().current_temperature, t);
    }

    let received = requests(&server).await;
    assert_eq!(received.len(), 23);
    assert_eq!(query_value(&received[0], "temperature").as_deref(), Some("10"));
    assert_eq!(query_value(&received[22], "temperature").as_deref(), Some("32"));
}

#[tokio::test]
async fn power_is_zero_only_when_off() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    device.set_hvac_mode(HvacMode::Heat).await.unwrap();
    device.set_hvac_mode(HvacMode::Off).await.unwrap();
    assert!(!device.state().power());

    let received = requests(&server).await;
    assert_eq!(query_value(&received[0], "power").as_deref(), Some("1"));
    assert_eq!(query_value(&received[1], "power").as_deref(), Some("0"));
}

#[tokio::test]
async fn cool_fan3_21_scenario() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    device.set_hvac_mode(HvacMode::Cool).await.unwrap();
    device.set_fan_mode(FanMode::Level(3)).await.unwrap();
    device.set_temperature(21).await;

    let received = requests(&server).await;
    let last = received.last().unwrap();
    assert_eq!(last.url.path(), "/state");
    assert_eq!(
        last.url.query(),
        Some("key=ABC&power=1&mode=cool&temperature=21&fan=3")
    );
}

#[tokio::test]
async fn heat_cool_rejected_without_request() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    let err = device.set_hvac_mode(HvacMode::HeatCool).await.unwrap_err();
    assert!(matches!(err, pico_climate::Error::UnsupportedMode(HvacMode::HeatCool)));
    assert_eq!(device.state().hvac_mode, HvacMode::Off);
    assert!(requests(&server).await.is_empty());
}

#[tokio::test]
async fn unadvertised_fan_rejected_without_request() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    let err = device.set_fan_mode(FanMode::Level(6)).await.unwrap_err();
    assert!(matches!(err, pico_climate::Error::UnsupportedFanMode(FanMode::Level(6))));
    assert_eq!(device.state().fan_mode, FanMode::Auto);
    assert!(requests(&server).await.is_empty());
}

#[tokio::test]
async fn no_key_segment_without_api_key() {
    let server = MockServer::start().await;
    mount_state_ok(&server).await;
    let mut device = ClimateDevice::builder("ac", "AC", device_addr(&server))
        .build()
        .unwrap();

    device.set_hvac_mode(HvacMode::Dry).await.unwrap();

    let received = requests(&server).await;
    assert_eq!(
        received[0].url.query(),
        Some("power=1&mode=dry&temperature=23&fan=Auto")
    );
}

#[tokio::test]
async fn unreachable_device_keeps_commanded_state() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let mut device = ClimateDevice::builder("ac", "AC", addr)
        .api_key("ABC")
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();

    device.set_hvac_mode(HvacMode::Cool).await.unwrap();
    device.set_fan_mode(FanMode::Silent).await.unwrap();
    device.set_temperature(18).await;

    assert_eq!(device.state().hvac_mode, HvacMode::Cool);
    assert_eq!(device.state().fan_mode, FanMode::Silent);
    assert_eq!(device.state().target_temperature, 18);

    let err = device.try_send_state().await.unwrap_err();
    assert!(matches!(err, pico_climate::Error::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_device_times_out_quietly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let mut device = ClimateDevice::builder("ac", "AC", device_addr(&server))
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    device.set_temperature(25).await;
    assert_eq!(device.state().target_temperature, 25);

    match device.try_send_state().await {
        Err(pico_climate::Error::Http(e)) => assert!(e.is_timeout(), "expected timeout: {e}"),
        other => panic!("expected HTTP timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_is_swallowed_by_send_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/state"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let mut device = ClimateDevice::builder("ac", "AC", device_addr(&server))
        .build()
        .unwrap();

    device.set_hvac_mode(HvacMode::Heat).await.unwrap();
    device.send_state().await;
    assert_eq!(device.state().hvac_mode, HvacMode::Heat);
    assert!(device.try_send_state().await.is_err());
    assert_eq!(requests(&server).await.len(), 3);
}

#[tokio::test]
async fn restore_off_without_temperature_uses_default() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    let snapshot: StateSnapshot = serde_json::from_value(serde_json::json!({
        "state": "off",
        "attributes": { "fan_mode": "Auto" }
    }))
    .unwrap();
    device.restore_state(&snapshot).await;

    assert_eq!(device.state().target_temperature, 23);
    assert_eq!(device.state().current_temperature, 23);

    let received = requests(&server).await;
    assert_eq!(received.len(), 1);
    let query = received[0].url.query().unwrap();
    assert!(query.contains("power=0&mode=off&temperature=23"), "{query}");
}

#[tokio::test]
async fn restore_adopts_snapshot_fields() {
    let server = MockServer::start().await;
    let mut device = keyed_device(&server).await;

    let snapshot: StateSnapshot = serde_json::from_value(serde_json::json!({
        "state": "heat",
        "attributes": { "temperature": 26.0, "fan_mode": "5", "current_temperature": 26 }
    }))
    .unwrap();
    device.restore_state(&snapshot).await;

    assert_eq!(
        *device.state(),
        DeviceState {
            hvac_mode: HvacMode::Heat,
            fan_mode: FanMode::Level(5),
            target_temperature: 26,
            current_temperature: 26,
        }
    );
    assert_eq!(device.snapshot(), device.state().to_snapshot());

    let received = requests(&server).await;
    assert_eq!(
        received[0].url.query(),
        Some("key=ABC&power=1&mode=heat&temperature=26&fan=5")
    );
}

#[tokio::test]
async fn power_format_uses_on_off_endpoints() {
    let server = MockServer::start().await;
    for p in ["/on", "/off"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }
    let mut device = ClimateDevice::builder("ac", "AC", device_addr(&server))
        .api_key("ABC")
        .command_format(CommandFormat::Power)
        .build()
        .unwrap();

    device.set_hvac_mode(HvacMode::Cool).await.unwrap();
    device.set_hvac_mode(HvacMode::Off).await.unwrap();

    let received = requests(&server).await;
    assert_eq!(received[0].url.path(), "/on");
    assert_eq!(received[1].url.path(), "/off");
    assert!(received.iter().all(|r| r.url.query().is_none()));
}

#[tokio::test]
async fn state_callback_fires_on_each_change() {
    let server = MockServer::start().await;
    mount_state_ok(&server).await;

    let seen: Arc<Mutex<Vec<DeviceState>>> = Arc::new(Mutex::new(vec![]));
    let seen_clone = seen.clone();
    let mut device = ClimateDevice::builder("ac", "AC", device_addr(&server))
        .on_state(move |state| seen_clone.lock().unwrap().push(*state))
        .build()
        .unwrap();

    device.set_hvac_mode(HvacMode::FanOnly).await.unwrap();
    device.set_temperature(30).await;
    let _ = device.set_hvac_mode(HvacMode::HeatCool).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].hvac_mode, HvacMode::FanOnly);
    assert_eq!(seen[1].target_temperature, 30);
}

#[tokio::test]
async fn message_log_redacts_api_key() {
    let server = MockServer::start().await;
    mount_state_ok(&server).await;
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let log_path = tmp.path().to_str().unwrap().to_string();

    let mut device = ClimateDevice::builder("ac", "AC", device_addr(&server))
        .api_key("topsecret")
        .message_log(MessageLogMode::Full, &log_path)
        .build()
        .unwrap();
    device.set_hvac_mode(HvacMode::Cool).await.unwrap();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(!contents.contains("topsecret"));
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["action"], "set_hvac_mode");
    assert!(lines[0]["url"].as_str().unwrap().contains("key=***"));
    assert_eq!(lines[1]["status"], 200);
}

#[test]
fn build_rejects_bad_address() {
    for addr in ["bad host", "127.0.0.1:8080?x", "127.0.0.1#frag", "admin@127.0.0.1"] {
        let result = ClimateDevice::builder("ac", "AC", addr).build();
        assert!(
            matches!(result, Err(pico_climate::Error::InvalidUrl(_))),
            "{addr} should be rejected"
        );
    }
}
