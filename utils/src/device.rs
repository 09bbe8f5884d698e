use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// True when the host exposes at least one capture device.
pub fn has_input_device() -> bool {
    let host = get_host();
    host.input_devices()
        .map(|mut devices| devices.next().is_some())
        .unwrap_or(false)
}

/// Finds the named input device, or the host default when no name is given.
pub fn get_or_default_input(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    let target = match device_name {
        Some(name) => name,
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No default input device"))?
            .name()?,
    };

    host.input_devices()?
        .find(|d| d.name().is_ok_and(|name| name == target))
        .ok_or_else(|| anyhow::anyhow!("No target device found: {}", target))
}

/// Finds the named output device, or the host default when no name is given.
pub fn get_or_default_output(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    let target = match device_name {
        Some(name) => name,
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device"))?
            .name()?,
    };

    host.output_devices()?
        .find(|d| d.name().is_ok_and(|name| name == target))
        .ok_or_else(|| anyhow::anyhow!("No target device found: {}", target))
}

fn describe(device: &Device, config: anyhow::Result<cpal::SupportedStreamConfig>, default: &str) -> String {
    let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
    let mut d = match config {
        Ok(cfg) => format!(" * {}({}ch, {}hz)", name, cfg.channels(), cfg.sample_rate().0),
        Err(_) => format!(" * {}(no default config)", name),
    };
    if name == default {
        d.push_str(" [default]");
    }
    d
}

pub fn get_available_inputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();
    let default_device = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let device_names: Vec<String> = host
        .input_devices()?
        .map(|d| {
            let cfg = d.default_input_config().map_err(anyhow::Error::from);
            describe(&d, cfg, &default_device)
        })
        .collect();
    Ok(device_names.join("\n"))
}

pub fn get_available_outputs() -> anyhow::Result<String> {
    let host = get_host();
    let default_device = host
        .default_output_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let device_names: Vec<String> = host
        .output_devices()?
        .map(|d| {
            let cfg = d.default_output_config().map_err(anyhow::Error::from);
            describe(&d, cfg, &default_device)
        })
        .collect();
    Ok(device_names.join("\n"))
}
