//! Runtime integration layer.
//!
//! Each input device serves on its own OS thread with a current-thread Tokio
//! runtime, so one device's slow interceptors only ever backpressure that device.

pub(crate) mod device_runtime;
