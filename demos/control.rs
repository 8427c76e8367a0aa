use pico_climate::{ClimateDeviceBuilder, FanMode, HvacMode, MessageLogMode, PlatformConfig};
use std::env;

fn arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[tokio::main]
async fn main() -> pico_climate::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let usage = "usage: control <config.toml> <unique_id> [--mode <mode>] [--fan <fan>] [--temp <c>] [--log <path>]";
    let config_path = args.get(1).expect(usage);
    let unique_id = args.get(2).expect(usage);

    let config = PlatformConfig::load(config_path)?;
    let device_config = config
        .devices
        .iter()
        .find(|d| &d.unique_id == unique_id)
        .unwrap_or_else(|| panic!("no device {unique_id} in {config_path}"));

    let mut builder = ClimateDeviceBuilder::from_config(device_config).on_state(|state| {
        println!(
            "-> {} | fan: {} | {}\u{00b0}C | power: {}",
            state.hvac_mode,
            state.fan_mode,
            state.target_temperature,
            if state.power() { "on" } else { "off" },
        );
    });
    if let Some(path) = arg(&args, "--log") {
        builder = builder.message_log(MessageLogMode::Full, path);
    }
    let mut device = builder.build()?;

    if let Some(mode) = arg(&args, "--mode") {
        let mode = HvacMode::from_device_str(mode).unwrap_or_else(|| panic!("unknown mode: {mode}"));
        device.set_hvac_mode(mode).await?;
    }
    if let Some(fan) = arg(&args, "--fan") {
        let fan = FanMode::from_device_str(fan).unwrap_or_else(|| panic!("unknown fan mode: {fan}"));
        device.set_fan_mode(fan).await?;
    }
    if let Some(temp) = arg(&args, "--temp") {
        let temp: i32 = temp.parse().expect("temperature must be an integer");
        device.set_temperature(temp.clamp(pico_climate::MIN_TEMP, pico_climate::MAX_TEMP)).await;
    }

    println!("Verifying {} at {}...", device.name(), device.base_url());
    match device.try_send_state().await {
        Ok(()) => println!("Device accepted state."),
        Err(e) => eprintln!("Device unreachable: {e}"),
    }
    Ok(())
}
