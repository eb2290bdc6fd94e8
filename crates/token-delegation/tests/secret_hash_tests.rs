//! Secret hash vectors and properties.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use proptest::prelude::*;

use token_delegation::compute_secret_hash;

#[test]
fn test_known_vectors() {
    assert_eq!(
        compute_secret_hash("client-1", "secret-1", "alice"),
        "zlUKX2niPjSU74M3rkwmZocVGaXX+sNF9bOdFiOSbxo="
    );
    assert_eq!(
        compute_secret_hash("client-1", "secret-1", "bob"),
        "gVrNDAn8bXQB1qgehiTxy4dusWe7JtQJVGIuNKqjqV8="
    );
}

#[test]
fn test_empty_inputs_still_hash() {
    let hash = compute_secret_hash("", "", "");
    assert_eq!(STANDARD.decode(hash).unwrap().len(), 32);
}

#[test]
fn test_unicode_username() {
    let a = compute_secret_hash("client-1", "secret-1", "zoë");
    let b = compute_secret_hash("client-1", "secret-1", "zoe");
    assert_ne!(a, b);
}

proptest! {
    /// Same inputs, same hash.
    #[test]
    fn hash_is_deterministic(
        client_id in "[A-Za-z0-9]{1,26}",
        secret in "[A-Za-z0-9+/]{1,52}",
        username in "\\PC{1,64}",
    ) {
        prop_assert_eq!(
            compute_secret_hash(&client_id, &secret, &username),
            compute_secret_hash(&client_id, &secret, &username)
        );
    }

    /// Output is always a padded base64 SHA-256 MAC.
    #[test]
    fn hash_is_base64_of_32_bytes(
        client_id in "[A-Za-z0-9]{1,26}",
        secret in "[A-Za-z0-9+/]{1,52}",
        username in "\\PC{1,64}",
    ) {
        let hash = compute_secret_hash(&client_id, &secret, &username);
        prop_assert_eq!(hash.len(), 44);
        prop_assert_eq!(STANDARD.decode(&hash).unwrap().len(), 32);
    }

    /// A different secret gives a different hash.
    #[test]
    fn hash_depends_on_secret(
        username in "[a-z]{1,16}",
        secret in "[A-Za-z0-9]{8,32}",
    ) {
        let other = format!("{secret}x");
        prop_assert_ne!(
            compute_secret_hash("client-1", &secret, &username),
            compute_secret_hash("client-1", &other, &username)
        );
    }

    /// A different user gives a different hash.
    #[test]
    fn hash_depends_on_username(
        username in "[a-z]{1,16}",
    ) {
        let other = format!("{username}2");
        prop_assert_ne!(
            compute_secret_hash("client-1", "secret-1", &username),
            compute_secret_hash("client-1", "secret-1", &other)
        );
    }
}
