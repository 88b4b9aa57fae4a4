use anyhow::{Context, Result};
use log::info;

use crate::cli::ConfigureOpts;
use crate::device::DeviceConfiguration;
use crate::packet::Packet;
use crate::port::Connection;

pub fn run(opts: ConfigureOpts) -> Result<bool> {
    let cfg = resolve(&opts)?;
    let packet = Packet::encode(&cfg).context("building configuration packet")?;

    let mut conn = Connection::open(&opts.ser)
        .with_context(|| format!("opening {}", opts.ser.dev))?;
    let sent = conn.send(packet.as_bytes());
    conn.close();
    sent.with_context(|| format!("sending configuration to {}", opts.ser.dev))?;

    info!(
        "[cfg] sent {:?} mac={} sub_id={} scenario={} vendor={}",
        cfg.product_type,
        cfg.mac_low,
        cfg.sub_id,
        cfg.scenario_name().unwrap_or("?"),
        cfg.vendor_name().unwrap_or("?"),
    );
    println!("configuration sent to {}", opts.ser.dev);
    println!("{}", packet);
    Ok(true)
}

/// Config file (or factory defaults) with command-line overrides on top.
fn resolve(opts: &ConfigureOpts) -> Result<DeviceConfiguration> {
    let mut cfg = match &opts.config {
        Some(path) => DeviceConfiguration::load(path)?,
        None => DeviceConfiguration::default(),
    };
    if let Some(product) = opts.product {
        cfg.product_type = product;
    }
    if let Some(mac) = opts.mac {
        cfg.mac_low = mac;
    }
    if let Some(sub_id) = opts.sub_id {
        cfg.sub_id = sub_id;
    }
    Ok(cfg)
}
