use tokio::time::Instant;

use wire::frame::CAN_PKT_DATA_LEN;
use wire::func::FN_FFB_STATUS;

use super::*;
use crate::testutil::{bind_daemon_mailbox, daemon_lock};

async fn next_cmds(daemon_rx: &MailboxReceiver) -> Vec<CandCmd> {
    let mut buf = [0u8; MAX_RECORD_LEN];
    let (n, _) = daemon_rx
        .recv_timeout(&mut buf, Duration::from_secs(2))
        .await
        .expect("daemon mailbox record");

    let mut raw = Bytes::copy_from_slice(&buf[..n]);
    let mut cmds = Vec::new();
    while !raw.is_empty() {
        cmds.push(CandCmd::unmarshal(&mut raw).expect("parsing client record"));
    }
    cmds
}

#[tokio::test]
async fn test_open_rejects_invalid_triples() {
    assert_eq!(
        CanChannel::open(32, 0, 1, false).await.unwrap_err(),
        Error::ErrInvalidArgs
    );
    assert_eq!(
        CanChannel::open(0, 32, 1, false).await.unwrap_err(),
        Error::ErrInvalidArgs
    );
    assert_eq!(
        CanChannel::open(0, 0, 0, false).await.unwrap_err(),
        Error::ErrInvalidArgs
    );
}

#[tokio::test]
async fn test_open_registers_and_close_unregisters() {
    let _guard = daemon_lock();
    let daemon_rx = bind_daemon_mailbox();

    let channel = CanChannel::open(0x1C, 11, 1, true).await.unwrap();
    let task_id = client_task_id(0x1C, 11, 1);
    assert_eq!(
        next_cmds(&daemon_rx).await,
        vec![CandCmd::Register {
            slot: 0x1C,
            fn_type: 11,
            fn_count: 1,
            cmd_task_id: task_id,
            stream_task_id: Some(task_id),
        }]
    );

    assert_eq!(channel.remaining_timeout(), Duration::ZERO);
    channel.close().await.unwrap();
    assert_eq!(
        next_cmds(&daemon_rx).await,
        vec![CandCmd::Unregister {
            slot: 0x1C,
            fn_type: 11,
            fn_count: 1,
        }]
    );
}

#[tokio::test]
async fn test_tx_batches_whole_message_into_one_record() {
    let _guard = daemon_lock();
    let daemon_rx = bind_daemon_mailbox();

    let channel = CanChannel::open(0x1C, 11, 1, false).await.unwrap();
    let _register = next_cmds(&daemon_rx).await;

    let payload: Vec<u8> = (1..=13).collect();
    channel.tx(&payload, false).await.unwrap();

    let cmds = next_cmds(&daemon_rx).await;
    assert_eq!(cmds.len(), 3, "13 bytes fragment into three frames");

    let mut reassembler = Reassembler::new();
    for cmd in &cmds {
        match cmd {
            CandCmd::TxFrame { can_id, frame } => {
                assert_eq!(*can_id, 0x1C);
                assert!(frame.len() <= 2 + CAN_PKT_DATA_LEN);
                reassembler.push(frame).unwrap();
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
    let mut out = [0u8; 32];
    assert_eq!(reassembler.get(&mut out).unwrap(), 13);
    assert_eq!(&out[..13], payload.as_slice());

    channel.close().await.unwrap();
    let _ = next_cmds(&daemon_rx).await;
}

#[tokio::test]
async fn test_tx_to_fieldbus_status_paces_frames() {
    let _guard = daemon_lock();
    let daemon_rx = bind_daemon_mailbox();

    let channel = CanChannel::open(0x18, FN_FFB_STATUS, 1, false).await.unwrap();
    let _register = next_cmds(&daemon_rx).await;

    let payload: Vec<u8> = (1..=13).collect();
    let started = Instant::now();
    channel.tx(&payload, false).await.unwrap();
    let elapsed = started.elapsed();
    assert!(
        elapsed >= INTER_FRAME_DELAY * 3,
        "three paced frames need three gaps, took {elapsed:?}"
    );

    // One record per frame rather than one batch.
    for _ in 0..3 {
        let cmds = next_cmds(&daemon_rx).await;
        assert_eq!(cmds.len(), 1);
        assert!(matches!(cmds[0], CandCmd::TxFrame { can_id: 0x18, .. }));
    }

    channel.close().await.unwrap();
    let _ = next_cmds(&daemon_rx).await;
}

#[tokio::test]
async fn test_stream_calls_require_streaming_channel() {
    let _guard = daemon_lock();
    let daemon_rx = bind_daemon_mailbox();

    let mut channel = CanChannel::open(2, 5, 1, false).await.unwrap();
    let _register = next_cmds(&daemon_rx).await;

    let mut buf = [0u8; 16];
    assert_eq!(
        channel
            .stream_recv_timeout(&mut buf, Duration::from_millis(10))
            .await
            .unwrap_err(),
        Error::ErrInvalidSequence
    );
    assert_eq!(channel.stream_flush().unwrap_err(), Error::ErrInvalidSequence);
    assert_eq!(channel.stream_fd().unwrap_err(), Error::ErrInvalidSequence);

    channel.close().await.unwrap();
    let _ = next_cmds(&daemon_rx).await;
}

#[tokio::test]
async fn test_request_rejects_empty_buffers() {
    let _guard = daemon_lock();
    let daemon_rx = bind_daemon_mailbox();

    let mut channel = CanChannel::open(3, 5, 1, false).await.unwrap();
    let _register = next_cmds(&daemon_rx).await;

    let mut out = [0u8; 4];
    assert_eq!(
        channel
            .request(&[], &mut out, Duration::from_millis(10))
            .await
            .unwrap_err(),
        Error::ErrInvalidArgs
    );
    let mut empty: [u8; 0] = [];
    assert_eq!(
        channel
            .request(&[1], &mut empty, Duration::from_millis(10))
            .await
            .unwrap_err(),
        Error::ErrInvalidArgs
    );

    channel.close().await.unwrap();
    let _ = next_cmds(&daemon_rx).await;
}
