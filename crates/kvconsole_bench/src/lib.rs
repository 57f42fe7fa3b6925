//! Benchmark utilities.

#![warn(missing_docs)]

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Prefixes keys are spread across, so prefix scans hit a known fraction.
pub const PREFIXES: [&str; 4] = ["alpha:", "beta:", "gamma:", "delta:"];

/// Generate random value bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a random key under one of [`PREFIXES`].
pub fn random_key() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let prefix = PREFIXES[rng.gen_range(0..PREFIXES.len())];
    let suffix: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{prefix}{suffix}").into_bytes()
}

/// Generate `count` random records with values of `value_size` bytes.
pub fn generate_records(count: usize, value_size: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count)
        .map(|_| (random_key(), random_data(value_size)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_known_prefixes() {
        for _ in 0..20 {
            let key = random_key();
            assert!(PREFIXES.iter().any(|p| key.starts_with(p.as_bytes())));
        }
    }

    #[test]
    fn record_sizes() {
        let records = generate_records(5, 16);
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|(_, v)| v.len() == 16));
    }
}
