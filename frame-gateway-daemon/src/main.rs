/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod builtin;
mod config;

use crate::builtin::{LogDriver, MaxPayloadInterceptor};
use crate::config::{Config, DriverKind, InterceptorKind};
use clap::Parser;
use frame_gateway::{
    BundleConfig, DeviceAddress, Gateway, GatewayError, Intercept, InterceptorMeta,
    RunningGateway, UdpInputDevice,
};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEVICE_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command()]
struct GatewayArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    info!("Started frame-gateway-daemon");

    // Get the config file.
    let args = GatewayArgs::parse();
    let mut file = File::open(&args.config)
        .map_err(|e| format!("Unable to open config file {}: {e}", args.config))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| format!("Unable to read config file: {e}"))?;
    let config: Config =
        json5::from_str(&contents).map_err(|e| format!("Unable to parse config file: {e}"))?;

    let mut running = build_gateway(&config)?.start()?;

    wait_for_shutdown(&running).await;
    running.stop();

    let shutdown_timeout = config.gateway.shutdown_timeout;
    let join = tokio::task::spawn_blocking(move || running.join_devices());
    match tokio::time::timeout(shutdown_timeout, join).await {
        Ok(Ok(exits)) => {
            for exit in exits {
                match exit.result {
                    Ok(()) => info!(
                        device = exit.device.as_str(),
                        address = exit.address.as_str(),
                        "device exited"
                    ),
                    Err(err) => error!(
                        device = exit.device.as_str(),
                        address = exit.address.as_str(),
                        err = %err,
                        "device exited with error"
                    ),
                }
            }
        }
        Ok(Err(err)) => error!(err = %err, "unable to join device loops"),
        Err(_elapsed) => warn!(
            timeout_ms = shutdown_timeout.as_millis() as u64,
            "device loops still running at shutdown timeout"
        ),
    }

    info!("Stopped frame-gateway-daemon");
    Ok(())
}

/// Assembles a gateway from `config` without starting it.
fn build_gateway(config: &Config) -> Result<Gateway, GatewayError> {
    let mut gateway = Gateway::new(&config.gateway.name);

    for interceptor in &config.interceptors {
        let args = bundle_args(&interceptor.name, &interceptor.args)?;
        match interceptor.kind {
            InterceptorKind::Drop => gateway.register_interceptor_fn(
                &interceptor.name,
                interceptor.priority,
                &interceptor.topics,
                |_, _| Intercept::Drop,
            )?,
            InterceptorKind::MaxPayload => {
                let meta = InterceptorMeta::new(
                    &interceptor.name,
                    interceptor.priority,
                    &interceptor.topics,
                )
                .map_err(GatewayError::Pattern)?;
                let guard = MaxPayloadInterceptor::from_args(meta, &args).map_err(|source| {
                    GatewayError::Init {
                        bundle: interceptor.name.clone(),
                        source,
                    }
                })?;
                gateway.register_interceptor(Arc::new(guard))?;
            }
        }
    }

    for driver in &config.drivers {
        let args = bundle_args(&driver.name, &driver.args)?;
        match driver.kind {
            DriverKind::Log => {
                gateway.add_driver(Box::new(LogDriver::new(&driver.name)), &args)?
            }
        }
    }

    for device in &config.udp_devices {
        let args = bundle_args(&device.name, &device.args)?;
        let address = DeviceAddress::new(&device.group_address, &device.private_address);
        let input = UdpInputDevice::new(&device.name, address);
        gateway.add_input_device(Box::new(input), &args)?;
    }

    Ok(gateway)
}

fn bundle_args(name: &str, args: &serde_json::Value) -> Result<BundleConfig, GatewayError> {
    BundleConfig::from_value(args.clone()).map_err(|source| GatewayError::Init {
        bundle: name.to_string(),
        source,
    })
}

/// Returns on Ctrl-C, or once every input device loop has exited on its own.
async fn wait_for_shutdown(running: &RunningGateway) {
    let device_count = running.device_names().len();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(DEVICE_POLL_INTERVAL);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(err) = signal {
                    error!(err = %err, "unable to listen for Ctrl-C");
                }
                info!("Shutdown requested");
                return;
            }
            _ = ticker.tick() => {
                if device_count > 0 && running.finished_devices().len() == device_count {
                    warn!("All input devices stopped; shutting down");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::build_gateway;
    use crate::config::Config;
    use frame_gateway::GatewayError;

    #[test]
    fn sample_config_assembles() {
        let config: Config = json5::from_str(include_str!("../config/gateway.json5")).unwrap();

        let gateway = build_gateway(&config).expect("sample config should assemble");

        assert_eq!(gateway.interceptor_count(), 2);
        assert_eq!(gateway.context().gateway_name(), "edge-gateway");
    }

    #[test]
    fn malformed_interceptor_topics_are_rejected() {
        let config: Config = json5::from_str(
            r#"{
                gateway: { name: "g" },
                interceptors: [{ name: "bad", topics: ["a/#/b"], kind: "drop" }],
            }"#,
        )
        .unwrap();

        assert!(matches!(
            build_gateway(&config),
            Err(GatewayError::Pattern(_))
        ));
    }

    #[test]
    fn invalid_device_options_fail_assembly() {
        let config: Config = json5::from_str(
            r#"{
                gateway: { name: "g" },
                udp_devices: [{
                    name: "in",
                    group_address: "127.0.0.1",
                    private_address: "0",
                    args: { bufferSizeKB: 0 },
                }],
            }"#,
        )
        .unwrap();

        assert!(matches!(
            build_gateway(&config),
            Err(GatewayError::Init { ref bundle, .. }) if bundle == "in"
        ));
    }
}
