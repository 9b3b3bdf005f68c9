use rand::Rng;

use super::*;

fn test_addr() -> DeviceAddr {
    DeviceAddr::new(0x1C, 11, 1).unwrap()
}

fn reassemble(frames: &[Bytes]) -> Result<Vec<u8>> {
    let mut reassembler = Reassembler::new();
    for frame in frames {
        reassembler.push(frame)?;
    }
    let mut out = vec![0u8; MAX_MESSAGE_LEN];
    let n = reassembler.get(&mut out)?;
    out.truncate(n);
    Ok(out)
}

#[test]
fn test_single_frame_no_crc() -> Result<()> {
    let payload = [1, 2, 3, 4, 5, 6];
    let frames = fragment_payload(test_addr(), &payload)?;

    assert_eq!(frames.len(), 1);
    let addr = DeviceAddr::unmarshal(&frames[0])?;
    assert!(!addr.is_fragment());
    assert_eq!(&frames[0][ADDR_LEN..], &payload);

    assert_eq!(reassemble(&frames)?, payload);
    Ok(())
}

#[test]
fn test_seven_byte_payload_splits_with_trailing_crc() -> Result<()> {
    let payload = [1, 2, 3, 4, 5, 6, 7];
    let frames = fragment_payload(test_addr(), &payload)?;

    assert_eq!(frames.len(), 2);
    assert!(DeviceAddr::unmarshal(&frames[0])?.is_fragment());
    assert!(!DeviceAddr::unmarshal(&frames[1])?.is_fragment());

    assert_eq!(&frames[0][ADDR_LEN..], &payload[..6]);
    // Last frame: one payload byte, then CRC low and high.
    let crc = crc16(&payload);
    assert_eq!(
        &frames[1][ADDR_LEN..],
        &[7, (crc & 0xFF) as u8, (crc >> 8) as u8]
    );

    assert_eq!(reassemble(&frames)?, payload);
    Ok(())
}

#[test]
fn test_crc_straddles_final_two_frames() -> Result<()> {
    // 11 payload bytes: 6 + 5 leaves the second frame one byte short, so it
    // takes the CRC low byte and the final frame carries only the high byte.
    let payload: Vec<u8> = (1..=11).collect();
    let frames = fragment_payload(test_addr(), &payload)?;

    assert_eq!(frames.len(), 3);
    let crc = crc16(&payload).to_le_bytes();
    assert_eq!(frames[1].len(), ADDR_LEN + CAN_PKT_DATA_LEN);
    assert_eq!(frames[1][ADDR_LEN + 5], crc[0]);
    assert_eq!(&frames[2][ADDR_LEN..], &[crc[1]]);
    assert!(DeviceAddr::unmarshal(&frames[1])?.is_fragment());
    assert!(!DeviceAddr::unmarshal(&frames[2])?.is_fragment());

    assert_eq!(reassemble(&frames)?, payload);
    Ok(())
}

#[test]
fn test_round_trip_identity_across_sizes() -> Result<()> {
    let mut rng = rand::thread_rng();
    for len in 1..=1024usize {
        let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let frames = fragment_payload(test_addr(), &payload)?;

        let expected = (len + FRAGMENT_CRC_LEN + CAN_PKT_DATA_LEN - 1) / CAN_PKT_DATA_LEN;
        if len <= CAN_PKT_DATA_LEN {
            assert_eq!(frames.len(), 1);
        } else {
            assert_eq!(frames.len(), expected, "frame count for len {len}");
            for frame in &frames[..frames.len() - 1] {
                assert_eq!(frame.len(), ADDR_LEN + CAN_PKT_DATA_LEN);
            }
        }

        assert_eq!(reassemble(&frames)?, payload, "round trip for len {len}");
    }
    Ok(())
}

#[test]
fn test_encoder_is_deterministic() -> Result<()> {
    let payload: Vec<u8> = (0..200).map(|i| i as u8).collect();
    assert_eq!(
        fragment_payload(test_addr(), &payload)?,
        fragment_payload(test_addr(), &payload)?
    );
    Ok(())
}

#[test]
fn test_corrupted_byte_fails_crc() -> Result<()> {
    let mut rng = rand::thread_rng();
    let payload: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
    let frames = fragment_payload(test_addr(), &payload)?;

    for frame_ix in 0..frames.len() {
        for byte_ix in ADDR_LEN..frames[frame_ix].len() {
            for bit in 0..8 {
                let mut corrupted: Vec<Bytes> = frames.clone();
                let mut raw = corrupted[frame_ix].to_vec();
                raw[byte_ix] ^= 1 << bit;
                corrupted[frame_ix] = Bytes::from(raw);

                assert_eq!(
                    reassemble(&corrupted),
                    Err(Error::ErrWrongCrc),
                    "corruption in frame {frame_ix} byte {byte_ix} bit {bit} went undetected"
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_get_outcomes() -> Result<()> {
    let mut reassembler = Reassembler::new();
    let mut out = [0u8; 64];

    assert_eq!(reassembler.get(&mut out), Err(Error::ErrInvalidSequence));

    let payload: Vec<u8> = (1..=13).collect();
    let frames = fragment_payload(test_addr(), &payload)?;

    reassembler.push(&frames[0])?;
    assert_eq!(reassembler.get(&mut out), Err(Error::ErrDataPending));
    assert_eq!(reassembler.count(), 6);

    for frame in &frames[1..] {
        reassembler.push(frame)?;
    }
    assert_eq!(reassembler.get(&mut out)?, 13);
    assert_eq!(&out[..13], payload.as_slice());

    // A message is consumed by one read.
    assert_eq!(reassembler.get(&mut out), Err(Error::ErrInvalidSequence));
    Ok(())
}

#[test]
fn test_crc_failure_is_cleared_by_next_good_message() -> Result<()> {
    let payload: Vec<u8> = (1..=13).collect();
    let frames = fragment_payload(test_addr(), &payload)?;

    let mut corrupted = frames.clone();
    let mut raw = corrupted[0].to_vec();
    raw[2] ^= 0xFF;
    corrupted[0] = Bytes::from(raw);

    let mut reassembler = Reassembler::new();
    let mut out = [0u8; 64];

    for frame in &corrupted {
        reassembler.push(frame)?;
    }
    assert_eq!(reassembler.get(&mut out), Err(Error::ErrWrongCrc));

    for frame in &frames {
        reassembler.push(frame)?;
    }
    assert_eq!(reassembler.get(&mut out)?, 13);
    Ok(())
}

#[test]
fn test_flush_resets_state() -> Result<()> {
    let payload: Vec<u8> = (1..=13).collect();
    let frames = fragment_payload(test_addr(), &payload)?;

    let mut reassembler = Reassembler::new();
    reassembler.push(&frames[0])?;
    reassembler.flush();

    let mut out = [0u8; 64];
    assert_eq!(reassembler.get(&mut out), Err(Error::ErrInvalidSequence));
    assert_eq!(reassembler.count(), 0);
    Ok(())
}

#[test]
fn test_short_read_buffer_reports_full_length() -> Result<()> {
    let payload: Vec<u8> = (1..=13).collect();
    let frames = fragment_payload(test_addr(), &payload)?;

    let mut reassembler = Reassembler::new();
    for frame in &frames {
        reassembler.push(frame)?;
    }

    let mut out = [0u8; 4];
    assert_eq!(reassembler.get(&mut out)?, 13);
    assert_eq!(out, [1, 2, 3, 4]);
    Ok(())
}

#[test]
fn test_rejects_invalid_inputs() {
    assert_eq!(
        fragment_payload(test_addr(), &[]),
        Err(Error::ErrEmptyPayload)
    );
    assert_eq!(
        fragment_payload(test_addr(), &vec![0u8; MAX_MESSAGE_LEN + 1]),
        Err(Error::ErrPayloadTooLarge)
    );

    let mut reassembler = Reassembler::new();
    assert_eq!(reassembler.push(&[0x00]), Err(Error::ErrFrameLength));
    assert_eq!(
        reassembler.push(&[0u8; ADDR_LEN + CAN_PKT_DATA_LEN + 1]),
        Err(Error::ErrFrameLength)
    );
}
