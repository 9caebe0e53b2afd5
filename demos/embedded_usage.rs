//! Minimal embedding example for netpol-core
//!
//! This example demonstrates using netpol-core as a library in a custom
//! application. The controller lifecycle is fully managed by the
//! application: events are fed through an in-process channel, policies
//! land in the in-memory backend, and shutdown is programmatic.

use std::sync::Arc;

use netpol_core::{
    ChannelWatchSource, Container, ContainerPort, Controller, ControllerConfig, MemoryBackend,
    Pod, Protocol, ResourceBackend, TracingErrorSink, WatchEvent,
};

fn demo_pod(name: &str, port: u16) -> Pod {
    Pod {
        namespace: "demo".to_string(),
        name: name.to_string(),
        labels: Default::default(),
        containers: vec![Container {
            name: "app".to_string(),
            ports: vec![ContainerPort {
                protocol: Protocol::Tcp,
                container_port: port,
            }],
        }],
    }
}

#[tokio::main]
async fn main() -> netpol_core::Result<()> {
    println!("=== Embedded netpol-core Example ===\n");

    tracing_subscriber::fmt().init();

    // Create custom components
    let backend = Arc::new(MemoryBackend::new());
    let sink = Arc::new(TracingErrorSink);
    let (source, watch_tx) = ChannelWatchSource::new();

    // Create controller
    println!("1. Creating controller...");
    let (controller, mut event_rx) =
        Controller::new(backend.clone(), sink, ControllerConfig::default())?;

    // Spawn event listener (optional)
    let event_listener = tokio::spawn(async move {
        println!("2. Event listener started");
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
        println!("Event listener stopped");
    });

    // Run controller in background with a programmatic shutdown handle
    println!("3. Starting controller in background...");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let run_handle = tokio::spawn(async move {
        controller
            .run_with_shutdown(Box::new(source), shutdown_rx)
            .await
    });

    // Feed the initial listing, then mark it complete; workers only start
    // once the sync marker arrives.
    println!("4. Feeding pods...");
    watch_tx
        .send(WatchEvent::Added(demo_pod("web", 80)))
        .ok();
    watch_tx
        .send(WatchEvent::Added(demo_pod("dns", 53)))
        .ok();
    watch_tx.send(WatchEvent::SyncComplete).ok();

    // Let the controller converge
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    println!(
        "\n5. Backend now holds {} policies:",
        backend.policy_count().await
    );
    for name in ["demo-web", "demo-dns"] {
        match backend.get_policy("demo", name).await? {
            Some(policy) => println!("   {} -> {:?}", name, policy.spec.pod_selector),
            None => println!("   {} -> (missing)", name),
        }
    }

    // Stop the controller
    println!("\n6. Stopping controller...");
    let _ = shutdown_tx.send(());
    run_handle.await.expect("controller task panicked")?;

    // Wait for event listener to drain
    let _ = tokio::time::timeout(tokio::time::Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Controller lifecycle is fully controlled by application");
    println!("- No global state");
    println!("- Watch events come from any in-process producer");
    println!("- All components are custom (not netpold defaults)");

    Ok(())
}
