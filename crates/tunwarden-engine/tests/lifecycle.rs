//! Interface lifecycle and data-plane behaviour against a mock device.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tunwarden_common::error::ErrorCode;
use tunwarden_engine::EngineSettings;

use common::{
    fast_settings, mock_interceptor, single_pass_settings, udp_packet, wait_for_stats,
    CountingProcessor,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_runs_one_loop() {
    let (interceptor, _tun) = mock_interceptor(Arc::new(CountingProcessor::direct()), fast_settings());
    let interceptor = Arc::new(interceptor);
    interceptor.create("utun0").await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let interceptor = Arc::clone(&interceptor);
        tasks.push(tokio::spawn(async move { interceptor.start().await }));
    }

    let mut started = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => started += 1,
            Err(e) => assert_eq!(e.code(), ErrorCode::AlreadyActive),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(interceptor.status().epoch, 1);

    interceptor.stop().await.unwrap();
}

#[tokio::test]
async fn test_loop_records_inbound_packets() {
    let processor = Arc::new(CountingProcessor::direct());
    let (interceptor, tun) = mock_interceptor(Arc::clone(&processor), fast_settings());

    for _ in 0..5 {
        tun.inject_packet(udp_packet(60));
    }
    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();

    let stats = wait_for_stats(&interceptor, |s| s.packets_in == 5).await;
    assert_eq!(stats.packets_in, 5);
    assert_eq!(stats.bytes_in, 300);
    assert_eq!(stats.packets_dropped, 0);
    assert_eq!(processor.calls(), 5);

    interceptor.stop().await.unwrap();
}

#[tokio::test]
async fn test_burst_bounds_one_pass() {
    let settings = single_pass_settings().with_burst(3);
    let (interceptor, tun) = mock_interceptor(Arc::new(CountingProcessor::direct()), settings);

    for _ in 0..10 {
        tun.inject_packet(udp_packet(40));
    }
    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();

    wait_for_stats(&interceptor, |s| s.packets_in == 3).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(interceptor.stats().packets_in, 3);
    assert_eq!(tun.pending_read_count(), 7);

    interceptor.stop().await.unwrap();
}

#[tokio::test]
async fn test_drop_verdicts_and_failures_are_counted() {
    for processor in [CountingProcessor::dropping(), CountingProcessor::failing()] {
        let processor = Arc::new(processor);
        let (interceptor, tun) = mock_interceptor(Arc::clone(&processor), fast_settings());
        tun.inject_packet(udp_packet(28));
        tun.inject_packet(udp_packet(28));

        interceptor.create("utun0").await.unwrap();
        interceptor.start().await.unwrap();

        let stats = wait_for_stats(&interceptor, |s| s.packets_dropped == 2).await;
        assert_eq!(stats.packets_in, 2);
        assert_eq!(stats.packets_dropped, 2);
        assert!(interceptor.is_active());

        interceptor.stop().await.unwrap();
    }
}

#[tokio::test]
async fn test_read_errors_are_absorbed() {
    let (interceptor, tun) = mock_interceptor(Arc::new(CountingProcessor::direct()), fast_settings());
    tun.fail_next_reads(3);
    tun.inject_packet(udp_packet(50));
    tun.inject_packet(udp_packet(50));

    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();

    let stats = wait_for_stats(&interceptor, |s| s.packets_in == 2).await;
    assert_eq!(stats.packets_in, 2);
    assert!(interceptor.is_active());
    assert!(tun.recv_calls() >= 5);

    interceptor.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_interrupts_stalled_processor() {
    let processor = Arc::new(CountingProcessor::slow(Duration::from_secs(30)));
    let (interceptor, tun) = mock_interceptor(Arc::clone(&processor), fast_settings());
    tun.inject_packet(udp_packet(100));

    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();
    wait_for_stats(&interceptor, |s| s.packets_in == 1).await;
    assert_eq!(processor.calls(), 1);

    let began = Instant::now();
    let report = interceptor.stop().await.unwrap();
    assert!(began.elapsed() < Duration::from_secs(1));
    assert_eq!(report.interface, "utun0");
    assert_eq!(report.stats.packets_in, 1);
}

#[tokio::test]
async fn test_stop_race_leaves_next_period_clean() {
    let (interceptor, tun) = mock_interceptor(Arc::new(CountingProcessor::direct()), fast_settings());
    tun.set_read_delay(Some(Duration::from_millis(200)));
    tun.inject_packets((0..4).map(|_| udp_packet(80)));

    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();

    // Stop while the first read is still sleeping inside the device.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = interceptor.stop().await.unwrap();
    assert_eq!(report.stats.packets_in, 0);

    tun.set_read_delay(None);
    interceptor.create("utun0").await.unwrap();
    assert_eq!(interceptor.stats().packets_in, 0);
    assert_eq!(interceptor.start().await.unwrap(), 2);

    let stats = wait_for_stats(&interceptor, |s| s.packets_in == 4).await;
    assert_eq!(stats.packets_in, 4);
    assert_eq!(stats.bytes_in, 320);

    interceptor.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_counters_are_monotonic_under_concurrency() {
    let (interceptor, tun) = mock_interceptor(Arc::new(CountingProcessor::direct()), fast_settings());
    let interceptor = Arc::new(interceptor);
    tun.inject_packets((0..100).map(|_| udp_packet(30)));

    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();

    let observer = {
        let interceptor = Arc::clone(&interceptor);
        tokio::spawn(async move {
            let mut previous = interceptor.stats();
            for _ in 0..200 {
                let current = interceptor.stats();
                assert!(current.packets_in >= previous.packets_in);
                assert!(current.packets_out >= previous.packets_out);
                assert!(current.bytes_in >= previous.bytes_in);
                assert!(current.bytes_out >= previous.bytes_out);
                previous = current;
                tokio::task::yield_now().await;
            }
        })
    };

    let mut writers = Vec::new();
    for _ in 0..4 {
        let interceptor = Arc::clone(&interceptor);
        writers.push(tokio::spawn(async move {
            for _ in 0..25 {
                interceptor.write_packet(&udp_packet(40)).await.unwrap();
            }
        }));
    }
    for writer in writers {
        writer.await.unwrap();
    }
    observer.await.unwrap();

    let stats = wait_for_stats(&interceptor, |s| s.packets_in == 100).await;
    assert_eq!(stats.packets_out, 100);
    assert_eq!(stats.bytes_out, 4000);
    assert_eq!(stats.packets_in, 100);
    assert_eq!(tun.written_count(), 100);

    interceptor.stop().await.unwrap();
}

#[tokio::test]
async fn test_host_read_packet() {
    let (interceptor, tun) =
        mock_interceptor(Arc::new(CountingProcessor::direct()), single_pass_settings());
    assert_eq!(
        interceptor.read_packet().await.unwrap_err().code(),
        ErrorCode::NotActive
    );

    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();
    // Let the loop finish its first (empty) pass.
    tokio::time::sleep(Duration::from_millis(50)).await;

    tun.inject_packet(udp_packet(64));
    let packet = interceptor.read_packet().await.unwrap().unwrap();
    assert_eq!(packet.len(), 64);
    assert!(interceptor.read_packet().await.unwrap().is_none());
    assert_eq!(interceptor.stats().packets_in, 1);
    assert_eq!(interceptor.stats().bytes_in, 64);

    tun.fail_next_reads(1);
    assert_eq!(
        interceptor.read_packet().await.unwrap_err().code(),
        ErrorCode::DeviceError
    );

    interceptor.stop().await.unwrap();
}

#[tokio::test]
async fn test_reset_is_legal_in_any_state() {
    let (interceptor, _tun) = mock_interceptor(
        Arc::new(CountingProcessor::direct()),
        EngineSettings::default(),
    );
    interceptor.reset_stats();

    interceptor.create("utun0").await.unwrap();
    interceptor.start().await.unwrap();
    interceptor.write_packet(&udp_packet(28)).await.unwrap();
    interceptor.reset_stats();
    assert_eq!(interceptor.stats().packets_out, 0);

    interceptor.stop().await.unwrap();
    interceptor.reset_stats();
    assert_eq!(interceptor.stats().packets_out, 0);
}
