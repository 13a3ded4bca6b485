//! Access guard tests with many threads sharing one link.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gimbal_link::{LinkConfig, MemoryConnector, MemoryPort, ReadOutcome, SerialLink};

const READERS: usize = 4;
const WRITERS: usize = 4;
const FRAMES: usize = 64;
const FRAME_LEN: usize = 40;

fn shared_link() -> (Arc<SerialLink>, MemoryPort) {
    let port = MemoryPort::new();
    let link = SerialLink::with_connector(MemoryConnector::new(port.clone()));
    link.open(LinkConfig::new("mem0", 921600)).expect("open");
    (Arc::new(link), port)
}

#[test]
fn test_readers_never_observe_torn_buffer() {
    let (link, port) = shared_link();
    port.set_op_delay(Duration::from_micros(200));

    // Each frame is a run of one repeated byte, so any mix of two frames shows
    for k in 0..FRAMES {
        port.push_inbound(&[k as u8 + 1; FRAME_LEN]);
    }

    let received = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let link = link.clone();
            let received = received.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while received.load(Ordering::SeqCst) < FRAMES {
                    match link.read_frame(Duration::from_millis(2)) {
                        Ok(frame) => {
                            let bytes = frame.received();
                            assert_eq!(bytes.len(), FRAME_LEN);
                            assert!(
                                bytes.iter().all(|b| *b == bytes[0]),
                                "torn buffer: {:?}",
                                bytes
                            );
                            assert!(frame.as_bytes()[FRAME_LEN..].iter().all(|b| *b == 0));
                            seen.push(bytes[0]);
                            received.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(ReadOutcome::NoData) => {}
                        Err(e) => panic!("unexpected read outcome: {e}"),
                    }
                }
                seen
            })
        })
        .collect();

    let mut all: Vec<u8> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("reader panicked"))
        .collect();
    all.sort_unstable();
    let expected: Vec<u8> = (1..=FRAMES as u8).collect();
    assert_eq!(all, expected, "every frame read exactly once");
    assert_eq!(port.max_concurrent_ops(), 1);
}

#[test]
fn test_reads_and_writes_are_mutually_exclusive() {
    let (link, port) = shared_link();
    port.set_op_delay(Duration::from_micros(300));

    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let link = link.clone();
        handles.push(thread::spawn(move || {
            for i in 0..16u8 {
                let frame = [w as u8, i, 0xA5, 0x5A];
                assert_eq!(link.write_frame(&frame, frame.len()).expect("write"), 4);
            }
        }));
    }
    for _ in 0..READERS {
        let link = link.clone();
        let port = port.clone();
        handles.push(thread::spawn(move || {
            for i in 0..16u8 {
                port.push_inbound(&[0x3E, i, 0x00, i]);
                let _ = link.read_frame(Duration::from_millis(1));
            }
        }));
    }
    for h in handles {
        h.join().expect("worker panicked");
    }

    assert_eq!(port.max_concurrent_ops(), 1);

    // Whole writes land intact and in per-writer order
    let writes = port.writes();
    assert_eq!(writes.len(), WRITERS * 16);
    for w in 0..WRITERS as u8 {
        let sequence: Vec<u8> = writes
            .iter()
            .filter(|bytes| bytes[0] == w)
            .map(|bytes| {
                assert_eq!(&bytes[2..], &[0xA5, 0x5A]);
                bytes[1]
            })
            .collect();
        assert_eq!(sequence, (0..16u8).collect::<Vec<_>>());
    }
    assert_eq!(port.drains(), WRITERS * 16);
}

#[test]
fn test_status_does_not_wait_for_read() {
    let (link, _port) = shared_link();
    let reader = {
        let link = link.clone();
        thread::spawn(move || link.read_frame(Duration::from_millis(300)))
    };
    thread::sleep(Duration::from_millis(50));

    // The reader holds the guard for its whole timeout
    let start = std::time::Instant::now();
    assert_eq!(link.status(), gimbal_link::LinkStatus::Open);
    assert!(start.elapsed() < Duration::from_millis(100));

    assert!(matches!(reader.join().expect("reader"), Err(ReadOutcome::NoData)));
}
