use super::*;

#[test]
fn test_socket_path_is_deterministic() {
    let a = MailboxAddr::new(32768, 0);
    let b = MailboxAddr::new(32768, 0);
    assert_eq!(a.socket_path(), b.socket_path());
}

#[test]
fn test_distinct_addrs_map_to_distinct_paths() {
    let cmd = MailboxAddr::new(32768, 0);
    let stream = MailboxAddr::new(32768, 1);
    let other = MailboxAddr::new(32769, 0);

    assert_ne!(cmd.socket_path(), stream.socket_path());
    assert_ne!(cmd.socket_path(), other.socket_path());
}

#[test]
fn test_display() {
    assert_eq!(MailboxAddr::new(1, 0).to_string(), "1.0");
}
