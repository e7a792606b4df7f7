//! End-to-end reliability scenarios: ack handshake, single retry, status-loop
//! fallback and recovery, duplicate suppression, and clock-wrap behaviour.

use ogoa_link::{
    xor_checksum, Frame, Link, LinkError, LinkOps, ACK_TIMEOUT_MS, STATUS_LOOP_INTERVAL_MS,
    TYPE_ACK, TYPE_STATUS_REQUEST, TYPE_STATUS_RESPONSE, TYPE_SWEEP_DATA,
};

/// Everything the engine did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Tx(Vec<u8>),
    Frame(u8, u8, Vec<u8>), // seq, type, payload
    Error(LinkError),
}

#[derive(Default)]
struct RecordingOps {
    events: Vec<Event>,
    fail_tx: bool,
}

impl RecordingOps {
    fn transmissions(&self) -> Vec<&[u8]> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Tx(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .collect()
    }

    fn deliveries(&self) -> Vec<(u8, u8, &[u8])> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Frame(seq, ty, payload) => Some((*seq, *ty, payload.as_slice())),
                _ => None,
            })
            .collect()
    }

    fn errors(&self) -> Vec<LinkError> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Error(err) => Some(*err),
                _ => None,
            })
            .collect()
    }
}

impl LinkOps for RecordingOps {
    fn tx(&mut self, bytes: &[u8]) -> usize {
        if self.fail_tx {
            return 0;
        }
        self.events.push(Event::Tx(bytes.to_vec()));
        bytes.len()
    }

    fn on_frame(&mut self, frame: &Frame) {
        self.events.push(Event::Frame(
            frame.seq,
            frame.frame_type,
            frame.payload.to_vec(),
        ));
    }

    fn on_error(&mut self, error: LinkError) {
        self.events.push(Event::Error(error));
    }
}

fn wire_bytes(seq: u8, frame_type: u8, payload: &[u8]) -> Vec<u8> {
    Frame::new(seq, frame_type, payload)
        .unwrap()
        .encode_to_vec()
        .to_vec()
}

#[test]
fn happy_send_then_ack() {
    let mut link = Link::new(RecordingOps::default());
    link.send(TYPE_SWEEP_DATA, &[0x01, 0x02], 0).unwrap();

    // Exact bytes on the wire, checksum included.
    let mut expected = vec![0x27, 0x00, 0xAA, 0x02, 0x01, 0x02];
    expected.push(xor_checksum(&expected));
    assert_eq!(link.ops().transmissions(), vec![expected.as_slice()]);
    assert!(link.waiting_ack());

    // Ack for seq 0 resolves the pending frame.
    link.process_bytes(&wire_bytes(0, TYPE_ACK, &[]), 10);
    assert!(!link.waiting_ack());

    // And a new send is accepted, at the next sequence number.
    link.send(TYPE_SWEEP_DATA, &[0x03], 20).unwrap();
    let txs = link.ops().transmissions();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[1][1], 1);
}

#[test]
fn single_retry_then_status_loop() {
    let mut link = Link::new(RecordingOps::default());
    link.send(TYPE_SWEEP_DATA, &[0x01, 0x02], 0).unwrap();

    // Before the timeout nothing happens.
    link.tick(ACK_TIMEOUT_MS - 1);
    assert_eq!(link.ops().transmissions().len(), 1);

    // At the timeout the identical bytes go out again.
    link.tick(ACK_TIMEOUT_MS);
    let txs = link.ops().transmissions();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0], txs[1]);
    assert!(link.waiting_ack());

    // Second unanswered timeout: no transmission, the frame is abandoned
    // and the status loop takes over.
    link.tick(2 * ACK_TIMEOUT_MS);
    assert_eq!(link.ops().transmissions().len(), 2);
    assert!(!link.waiting_ack());
    assert!(link.status_loop_active());

    // While probing, new sends are still refused.
    assert_eq!(
        link.send(TYPE_SWEEP_DATA, &[9], 210),
        Err(LinkError::TxFailed)
    );
}

#[test]
fn status_loop_probes_and_exits_on_response() {
    let mut link = Link::new(RecordingOps::default());
    link.send(TYPE_SWEEP_DATA, &[0x01, 0x02], 0).unwrap();
    link.tick(100);
    link.tick(200);
    assert!(link.status_loop_active());

    // Probe fires one status-loop interval after entering the loop.
    link.tick(200 + STATUS_LOOP_INTERVAL_MS - 1);
    assert_eq!(link.ops().transmissions().len(), 2);
    link.tick(200 + STATUS_LOOP_INTERVAL_MS);
    let probe = link.ops().transmissions()[2].to_vec();
    assert_eq!(probe, wire_bytes(1, TYPE_STATUS_REQUEST, &[]));

    // Probes are not retried and do not wait for acks.
    assert!(!link.waiting_ack());

    // A second probe goes out at the next interval, with the next seq.
    link.tick(200 + 2 * STATUS_LOOP_INTERVAL_MS);
    assert_eq!(
        link.ops().transmissions()[3],
        wire_bytes(2, TYPE_STATUS_REQUEST, &[]).as_slice()
    );

    // Peer answers: the engine acks it, delivers it, and leaves the loop.
    link.process_bytes(&wire_bytes(0x7F, TYPE_STATUS_RESPONSE, &[0x00]), 800);

    let ops = link.ops();
    let n = ops.events.len();
    assert_eq!(
        ops.events[n - 2],
        Event::Tx(wire_bytes(0x7F, TYPE_ACK, &[]))
    );
    assert_eq!(
        ops.events[n - 1],
        Event::Frame(0x7F, TYPE_STATUS_RESPONSE, vec![0x00])
    );
    assert!(!link.status_loop_active());

    // Normal sending resumes.
    link.send(TYPE_SWEEP_DATA, &[5], 810).unwrap();
}

#[test]
fn ack_precedes_delivery_for_the_same_frame() {
    let mut link = Link::new(RecordingOps::default());
    link.process_bytes(&wire_bytes(5, TYPE_SWEEP_DATA, &[0xDE, 0xAD]), 0);

    let events = &link.ops().events;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], Event::Tx(wire_bytes(5, TYPE_ACK, &[])));
    assert_eq!(events[1], Event::Frame(5, TYPE_SWEEP_DATA, vec![0xDE, 0xAD]));
}

#[test]
fn duplicates_are_reacked_but_delivered_once() {
    let mut link = Link::new(RecordingOps::default());
    let frame = wire_bytes(5, TYPE_SWEEP_DATA, &[0xDE, 0xAD]);

    for _ in 0..3 {
        link.process_bytes(&frame, 0);
    }

    assert_eq!(link.ops().transmissions().len(), 3);
    assert_eq!(link.ops().deliveries().len(), 1);

    // A different frame is not suppressed, and the original frame is fresh
    // again afterwards (single-slot history).
    link.process_bytes(&wire_bytes(6, TYPE_SWEEP_DATA, &[0xDE, 0xAD]), 0);
    link.process_bytes(&frame, 0);
    assert_eq!(link.ops().deliveries().len(), 3);
}

#[test]
fn sequence_numbers_advance_by_one_mod_256() {
    let mut link = Link::new(RecordingOps::default());

    for i in 0..300u32 {
        link.send(TYPE_SWEEP_DATA, &[0], i).unwrap();
        let expected_seq = (i % 256) as u8;
        assert_eq!(link.ops().transmissions().last().unwrap()[1], expected_seq);
        link.process_bytes(&wire_bytes(expected_seq, TYPE_ACK, &[]), i);
    }
}

#[test]
fn retry_fires_across_clock_wrap() {
    let mut link = Link::new(RecordingOps::default());
    let start = u32::MAX - 50;
    link.send(TYPE_SWEEP_DATA, &[1], start).unwrap();

    // 99 ms elapsed (wrapping): still waiting.
    link.tick(start.wrapping_add(ACK_TIMEOUT_MS - 1));
    assert_eq!(link.ops().transmissions().len(), 1);

    // 100 ms elapsed, now past the wrap point: retry fires.
    link.tick(start.wrapping_add(ACK_TIMEOUT_MS));
    assert_eq!(link.ops().transmissions().len(), 2);
}

#[test]
fn corrupted_byte_loses_one_frame_only() {
    let mut link = Link::new(RecordingOps::default());

    let mut first = wire_bytes(1, TYPE_SWEEP_DATA, &[0x10, 0x20]);
    first[4] ^= 0x40; // corrupt a payload byte
    let second = wire_bytes(2, TYPE_SWEEP_DATA, &[0x30]);

    link.process_bytes(&first, 0);
    link.process_bytes(&second, 0);

    assert_eq!(link.ops().errors(), vec![LinkError::Checksum]);
    assert_eq!(link.ops().deliveries().len(), 1);
    assert_eq!(link.ops().deliveries()[0].0, 2);
}

#[test]
fn retry_transport_failure_reports_and_keeps_waiting() {
    let mut link = Link::new(RecordingOps::default());
    link.send(TYPE_SWEEP_DATA, &[1], 0).unwrap();

    link.ops_mut().fail_tx = true;
    link.tick(ACK_TIMEOUT_MS);
    assert_eq!(link.ops().errors(), vec![LinkError::TxFailed]);
    assert!(link.waiting_ack());

    // The transport recovers and the retry goes through on a later tick.
    link.ops_mut().fail_tx = false;
    link.tick(2 * ACK_TIMEOUT_MS);
    assert_eq!(link.ops().transmissions().len(), 2);
}

#[test]
fn two_links_converse() {
    let mut a = Link::new(RecordingOps::default());
    let mut b = Link::new(RecordingOps::default());

    a.send(TYPE_SWEEP_DATA, &[0xAB, 0xCD], 0).unwrap();

    // Deliver A's bytes to B.
    let a_out: Vec<u8> = a.ops().transmissions().concat();
    b.process_bytes(&a_out, 0);
    assert_eq!(b.ops().deliveries().len(), 1);
    assert_eq!(b.ops().deliveries()[0].2, &[0xAB, 0xCD]);

    // Deliver B's bytes (the ack) back to A.
    let b_out: Vec<u8> = b.ops().transmissions().concat();
    a.process_bytes(&b_out, 1);
    assert!(!a.waiting_ack());

    // The acked sender can immediately send again.
    a.send(TYPE_SWEEP_DATA, &[0xEF], 2).unwrap();
}
