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

//! Runtime helper for spawning input-device serve loops.

use crate::context::Context;
use crate::deliverer::Deliverer;
use crate::input_device::{InputDevice, ServeError};
use crate::observability::{events, fields};
use std::io;
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder;
use tracing::{error, info};

const COMPONENT: &str = "device_runtime";
const DEVICE_THREAD_NAME_PREFIX: &str = "gw-dev-";

/// Owns one device's serve thread; joining yields the loop's exit result.
pub(crate) struct DeviceLoopHandle {
    device: String,
    address: String,
    thread: thread::JoinHandle<Result<(), ServeError>>,
}

impl DeviceLoopHandle {
    pub(crate) fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the loop exits. A panicked loop is reported as a runtime failure.
    pub(crate) fn join(self) -> (String, String, Result<(), ServeError>) {
        let result = self.thread.join().unwrap_or_else(|_| {
            Err(ServeError::Runtime(io::Error::other(
                "device serve thread panicked",
            )))
        });
        (self.device, self.address, result)
    }
}

/// Spawns `device.serve` on a dedicated named thread and logs how it ends.
pub(crate) fn spawn_device_loop(
    device: Arc<dyn InputDevice>,
    ctx: Context,
    deliverer: Arc<dyn Deliverer>,
) -> io::Result<DeviceLoopHandle> {
    let device_name = device.name().to_string();
    let address = device.address().union();
    let thread_name = fields::device_thread_name(DEVICE_THREAD_NAME_PREFIX, &address);

    let spawned = {
        let device_name = device_name.clone();
        let address = address.clone();
        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(ServeError::Runtime)?;
                let result = runtime.block_on(device.serve(&ctx, deliverer.as_ref()));
                report_exit(&device_name, &address, &result);
                result
            })
    };

    match spawned {
        Ok(thread) => {
            info!(
                event = events::RUNTIME_SPAWN_OK,
                component = COMPONENT,
                device = device_name.as_str(),
                address = address.as_str(),
                thread = thread_name.as_str(),
                "device serve thread started"
            );
            Ok(DeviceLoopHandle {
                device: device_name,
                address,
                thread,
            })
        }
        Err(err) => {
            error!(
                event = events::RUNTIME_SPAWN_FAILED,
                component = COMPONENT,
                device = device_name.as_str(),
                address = address.as_str(),
                err = %err,
                "unable to spawn device serve thread"
            );
            Err(err)
        }
    }
}

fn report_exit(device: &str, address: &str, result: &Result<(), ServeError>) {
    match result {
        Ok(()) => info!(
            event = events::DEVICE_SERVE_STOPPED,
            component = COMPONENT,
            device,
            address,
            "device stopped"
        ),
        Err(err) => error!(
            event = events::DEVICE_SERVE_FAILED,
            component = COMPONENT,
            device,
            address,
            err = %err,
            "device stopped abnormally"
        ),
    }
}
