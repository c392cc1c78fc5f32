use anyhow::{bail, Context, Result};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

pub const MIN_PASSWORD_LEN: usize = 8;

const SCHEME: &str = "sha256";
const ROUNDS: u32 = 10_000;
const SALT_LEN: usize = 16;

fn stretch(salt: &[u8], password: &str, rounds: u32) -> [u8; 32] {
    let mut digest: [u8; 32] = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize()
        .into();
    for _ in 1..rounds {
        digest = Sha256::new()
            .chain_update(salt)
            .chain_update(digest)
            .finalize()
            .into();
    }
    digest
}

/// Hashes a password as `sha256$<rounds>$<salt hex>$<digest hex>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = stretch(&salt, password, ROUNDS);
    format!(
        "{SCHEME}${ROUNDS}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    )
}

pub fn verify_password(password: &str, encoded: &str) -> Result<bool> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(rounds), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        bail!("malformed password hash");
    };
    if scheme != SCHEME {
        bail!("unsupported password scheme: {scheme}");
    }
    let rounds: u32 = rounds.parse().context("password hash rounds")?;
    let salt = hex::decode(salt).context("password hash salt")?;
    let expected = hex::decode(expected).context("password hash digest")?;

    let actual = stretch(&salt, password, rounds.max(1));
    if expected.len() != actual.len() {
        return Ok(false);
    }
    let diff = actual
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(diff == 0)
}
