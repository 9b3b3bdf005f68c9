use super::*;

#[test]
fn test_cmd_ack_round_trip() -> Result<()> {
    let cmd = CmdAck::new(0x7F)?;
    assert_eq!(CmdAck::unmarshal(cmd.marshal()), cmd);

    let nack = CmdAck {
        command: 0x0A,
        err: true,
    };
    assert_eq!(nack.marshal(), 0x8A);
    assert_eq!(CmdAck::unmarshal(0x8A), nack);

    assert_eq!(CmdAck::new(0x80), Err(Error::ErrCommandOutOfRange));
    Ok(())
}

#[test]
fn test_ack_codes() {
    assert_eq!(AckCode::from(0), AckCode::NoErr);
    assert_eq!(AckCode::from(4), AckCode::InternalErr);
    assert_eq!(AckCode::from(5), AckCode::CmdFailed);
    assert_eq!(AckCode::from(42), AckCode::Unknown(42));
}

#[test]
fn test_ffb_configuration_points() {
    // The two fieldbus deviations are tied to the fieldbus function classes.
    assert_eq!(ACK_EXEMPT_FN_TYPE, FN_FFB_COMMAND);
    assert_eq!(INTER_FRAME_DELAY_FN_TYPE, FN_FFB_STATUS);
    assert_ne!(ACK_EXEMPT_FN_TYPE, INTER_FRAME_DELAY_FN_TYPE);
}
