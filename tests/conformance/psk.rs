use host_wizard::psk::*;

#[test]
fn generated_psk_is_hex_of_requested_size() {
    let psk = generate_psk(32).unwrap();
    assert_eq!(psk.len(), 64);
    assert!(psk.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_ne!(psk, generate_psk(32).unwrap());
}

#[test]
fn identity_follows_host_name() {
    assert_eq!(psk_identity("web01", 128), "web01 PSK");
    assert_eq!(psk_identity("  web01 ", 128), "web01 PSK");
    assert_eq!(psk_identity("", 128), "PSK");
}

#[test]
fn identity_is_truncated_to_fit() {
    let host = "h".repeat(200);
    let identity = psk_identity(&host, 128);
    assert_eq!(identity.chars().count(), 128);
    assert!(identity.ends_with(" PSK"));

    let identity = psk_identity("wéb-sérvér", 9);
    assert_eq!(identity, "wéb-s PSK");
}
