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

mod support;

use async_trait::async_trait;
use frame_gateway::{
    BundleConfig, Context, DeliverError, Deliverer, DeviceAddress, InputDevice, Lifecycle,
    PacketFrame, ServeError, ServeHandler, UdpInputDevice,
};
use integration_test_utils::{RecordingDeliverer, ScriptedListener, ScriptedStep};
use serde_json::json;
use std::error::Error;
use std::io;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use support::{config, eventually, started_scripted_device};
use tokio::net::UdpSocket;

fn spawn_serve(
    device: Arc<UdpInputDevice>,
    deliverer: RecordingDeliverer,
) -> tokio::task::JoinHandle<Result<(), ServeError>> {
    tokio::spawn(async move { device.serve(&Context::new("it"), &deliverer).await })
}

#[tokio::test]
async fn empty_frames_are_skipped_and_order_is_kept() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::new([
        ScriptedStep::Frame(vec![0xA1; 10]),
        ScriptedStep::Frame(Vec::new()),
        ScriptedStep::Frame(vec![0xB2; 20]),
    ]);
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading", "readTimeout": "50ms" }),
    ));
    let deliverer = RecordingDeliverer::new();
    let serve = spawn_serve(device.clone(), deliverer.clone());

    let published = deliverer.wait_for(2, Duration::from_secs(2)).await;
    device.on_stop(&Context::new("it"));
    let result = serve.await.expect("serve task");

    assert!(result.is_ok());
    assert_eq!(published.len(), 2);
    assert_eq!(published[0], ("sensor/1/reading".to_string(), vec![0xA1; 10]));
    assert_eq!(published[1], ("sensor/1/reading".to_string(), vec![0xB2; 20]));
    assert_eq!(deliverer.published().len(), 2);
}

#[tokio::test]
async fn temporary_errors_are_swallowed_until_a_fatal_one() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::new([
        ScriptedStep::Error(io::ErrorKind::TimedOut),
        ScriptedStep::Error(io::ErrorKind::TimedOut),
        ScriptedStep::Error(io::ErrorKind::TimedOut),
        ScriptedStep::Error(io::ErrorKind::WouldBlock),
        ScriptedStep::Error(io::ErrorKind::Interrupted),
        ScriptedStep::Frame(vec![0x01]),
        ScriptedStep::Error(io::ErrorKind::ConnectionReset),
    ]);
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading" }),
    ));
    let deliverer = RecordingDeliverer::new();

    let result = spawn_serve(device, deliverer.clone())
        .await
        .expect("serve task");

    match result {
        Err(ServeError::Transport(err)) => assert_eq!(err.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert_eq!(listener.reads(), 7);
    assert_eq!(deliverer.published().len(), 1);
}

#[tokio::test]
async fn cancellation_returns_ok_within_read_timeout() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::new(Vec::new());
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading", "readTimeout": "100ms" }),
    ));
    let serve = spawn_serve(device.clone(), RecordingDeliverer::new());
    assert!(eventually(Duration::from_secs(1), || listener.reads() >= 1).await);

    let stopped_at = Instant::now();
    device.on_stop(&Context::new("it"));
    let result = tokio::time::timeout(Duration::from_secs(2), serve)
        .await
        .expect("serve should notice cancellation")
        .expect("serve task");

    assert!(result.is_ok());
    assert!(stopped_at.elapsed() < Duration::from_millis(100) + Duration::from_millis(400));
}

#[tokio::test]
async fn temporary_deadline_errors_retry_and_others_are_fatal() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::new([
        ScriptedStep::DeadlineError(io::ErrorKind::TimedOut),
        ScriptedStep::Frame(vec![0x42]),
        ScriptedStep::DeadlineError(io::ErrorKind::PermissionDenied),
        ScriptedStep::Frame(vec![0x43]),
    ]);
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading" }),
    ));
    let deliverer = RecordingDeliverer::new();

    let result = spawn_serve(device, deliverer.clone())
        .await
        .expect("serve task");

    match result {
        Err(ServeError::Transport(err)) => assert_eq!(err.kind(), io::ErrorKind::PermissionDenied),
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert_eq!(listener.reads(), 1);
    assert_eq!(listener.remaining(), 1);
    assert_eq!(
        deliverer.published(),
        vec![("sensor/1/reading".to_string(), vec![0x42])]
    );
}

/// Stops the device, then rejects the publish, the way a stopping gateway does.
struct StoppingDeliverer {
    device: Arc<OnceLock<Arc<UdpInputDevice>>>,
}

#[async_trait]
impl Deliverer for StoppingDeliverer {
    async fn deliver_publish(
        &self,
        _topic: &str,
        _frame: PacketFrame,
    ) -> Result<(), DeliverError> {
        if let Some(device) = self.device.get() {
            device.on_stop(&Context::new("it"));
        }
        Err(DeliverError::NotAccepting)
    }
}

#[tokio::test]
async fn publish_rejected_during_stop_ends_serve_cleanly() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::new([ScriptedStep::Frame(vec![0x01])]);
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading" }),
    ));
    let slot = Arc::new(OnceLock::new());
    let _ = slot.set(device.clone());
    let deliverer = StoppingDeliverer { device: slot };

    let result = device.serve(&Context::new("it"), &deliverer).await;

    assert!(result.is_ok(), "{result:?}");
    assert!(device.is_cancelled());
}

#[tokio::test]
async fn rejected_publish_is_fatal_to_the_loop() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::new([ScriptedStep::Frame(vec![0x01, 0x02])]);
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading" }),
    ));
    let deliverer = RecordingDeliverer::rejecting(DeliverError::NotAccepting);

    let result = spawn_serve(device, deliverer).await.expect("serve task");

    assert!(matches!(result, Err(ServeError::Handler(_))));
}

#[tokio::test]
async fn bind_failure_is_reported_with_the_address() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::failing_bind(io::ErrorKind::AddrInUse);
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading" }),
    ));

    let result = spawn_serve(device, RecordingDeliverer::new())
        .await
        .expect("serve task");

    match result {
        Err(ServeError::Bind { address, source }) => {
            assert_eq!(address, "127.0.0.1:9000");
            assert_eq!(source.kind(), io::ErrorKind::AddrInUse);
        }
        other => panic!("expected bind failure, got {other:?}"),
    }
}

#[tokio::test]
async fn frames_larger_than_the_buffer_are_truncated() {
    integration_test_utils::init_logging();

    let listener = ScriptedListener::new([ScriptedStep::Frame(vec![0x7F; 1500])]);
    let device = Arc::new(started_scripted_device(
        &listener,
        json!({ "topic": "sensor/1/reading", "bufferSizeKB": 1, "readTimeout": "50ms" }),
    ));
    let deliverer = RecordingDeliverer::new();
    let serve = spawn_serve(device.clone(), deliverer.clone());

    let published = deliverer.wait_for(1, Duration::from_secs(2)).await;
    device.on_stop(&Context::new("it"));
    serve.await.expect("serve task").expect("clean exit");

    assert_eq!(published[0].1.len(), 1024);
}

struct FirstByteRouter;

#[async_trait]
impl ServeHandler for FirstByteRouter {
    async fn on_frame(
        &self,
        frame: PacketFrame,
        _ctx: &Context,
        deliverer: &dyn Deliverer,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let topic = format!("sensor/{}/reading", frame[0]);
        deliverer.deliver_publish(&topic, frame).await?;
        Ok(())
    }
}

#[tokio::test]
async fn installed_handler_replaces_the_topic_requirement() {
    integration_test_utils::init_logging();

    let ctx = Context::new("it");
    let listener = ScriptedListener::new([
        ScriptedStep::Frame(vec![3, 0xAA]),
        ScriptedStep::Frame(vec![7, 0xBB]),
    ]);
    let mut device = UdpInputDevice::with_listener(
        "routed",
        DeviceAddress::new("127.0.0.1", "9000"),
        Arc::new(listener.clone()),
    );
    device
        .on_init(&config(json!({ "readTimeout": "50ms" })), &ctx)
        .unwrap();
    device.set_serve_handler(Arc::new(FirstByteRouter));
    device.on_start(&ctx).expect("handler makes topic optional");

    let device = Arc::new(device);
    let deliverer = RecordingDeliverer::new();
    let serve = spawn_serve(device.clone(), deliverer.clone());
    let published = deliverer.wait_for(2, Duration::from_secs(2)).await;
    device.on_stop(&ctx);
    serve.await.expect("serve task").expect("clean exit");

    let topics: Vec<&str> = published.iter().map(|(topic, _)| topic.as_str()).collect();
    assert_eq!(topics, vec!["sensor/3/reading", "sensor/7/reading"]);
}

#[test]
fn start_without_topic_or_handler_is_rejected() {
    let ctx = Context::new("it");
    let mut device = UdpInputDevice::new("bare", DeviceAddress::new("127.0.0.1", "0"));
    device.on_init(&BundleConfig::empty(), &ctx).unwrap();

    assert!(device.on_start(&ctx).is_err());
}

#[tokio::test]
async fn real_udp_datagrams_are_published_in_order() {
    integration_test_utils::init_logging();

    let ctx = Context::new("it");
    let mut device = UdpInputDevice::new("udp", DeviceAddress::new("127.0.0.1", "0"));
    device
        .on_init(
            &config(json!({ "topic": "sensor/9/reading", "readTimeout": "50ms" })),
            &ctx,
        )
        .unwrap();
    device.on_start(&ctx).unwrap();
    let device = Arc::new(device);
    let deliverer = RecordingDeliverer::new();
    let serve = spawn_serve(device.clone(), deliverer.clone());

    assert!(eventually(Duration::from_secs(2), || device.local_addr().is_some()).await);
    let target = device.local_addr().expect("bound address");
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(&[1; 10], target).await.unwrap();
    sender.send_to(&[], target).await.unwrap();
    sender.send_to(&[2; 20], target).await.unwrap();

    let published = deliverer.wait_for(2, Duration::from_secs(2)).await;
    device.on_stop(&ctx);
    serve.await.expect("serve task").expect("clean exit");

    let payloads: Vec<Vec<u8>> = published.into_iter().map(|(_, payload)| payload).collect();
    assert_eq!(payloads, vec![vec![1; 10], vec![2; 20]]);
}
