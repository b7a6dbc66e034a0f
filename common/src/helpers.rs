use rand::Rng;

/// Transaction ids look like `TX-4821-305917X`.
pub fn generate_tx_id() -> String {
    let mut rng = rand::rng();
    format!(
        "TX-{}-{}X",
        rng.random_range(1000..=9999),
        rng.random_range(100_000..=999_999)
    )
}

/// Six-digit buyer PIN drawn from the thread-local CSPRNG.
pub fn generate_pin() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_id_has_expected_shape() {
        let id = generate_tx_id();
        let body = id.strip_prefix("TX-").unwrap();
        let (first, second) = body.split_once('-').unwrap();
        assert_eq!(first.len(), 4);
        assert!(first.chars().all(|c| c.is_ascii_digit()));
        let second = second.strip_suffix('X').unwrap();
        assert_eq!(second.len(), 6);
        assert!(second.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn pin_is_six_digits() {
        for _ in 0..100 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
