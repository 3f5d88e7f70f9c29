use rand::Rng;

/// Strip all whitespace and uppercase. Every identifier goes through this
/// exactly once, at construction.
pub fn clean(input: &str) -> String {
    input
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Lenient slice: the requested part if it lies inside `value`, else "".
pub fn get_slice(value: &str, start: usize, end: Option<usize>) -> &str {
    let len = value.len();
    if start >= len {
        return "";
    }
    match end {
        Some(end) if end <= len => value.get(start..end).unwrap_or(""),
        Some(_) => "",
        None => value.get(start..).unwrap_or(""),
    }
}

/// Left-pad with '0' up to `width` characters; longer input is left alone.
pub fn zfill(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }
    let mut out = String::with_capacity(width);
    for _ in 0..width - len {
        out.push('0');
    }
    out.push_str(value);
    out
}

pub fn random_digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let digit = rng.gen_range(0..10);
        out.push(char::from(b'0' + digit as u8));
    }
    out
}

pub fn random_alphanum_upper<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.gen_range(0..CHARSET.len());
        out.push(char::from(CHARSET[idx]));
    }
    out
}

pub fn random_upper_letters<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.gen_range(0..CHARSET.len());
        out.push(char::from(CHARSET[idx]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn clean_strips_whitespace_and_uppercases() {
        assert_eq!(clean("de89 3704\t0044\n0532 0130 00"), "DE89370400440532013000");
        assert_eq!(clean("  genodem1gls "), "GENODEM1GLS");
    }

    #[test]
    fn get_slice_is_lenient() {
        assert_eq!(get_slice("GENODEM1", 0, Some(4)), "GENO");
        assert_eq!(get_slice("GENODEM1", 8, Some(11)), "");
        assert_eq!(get_slice("GENODEM1", 6, Some(11)), "");
        assert_eq!(get_slice("DE89370400440532013000", 4, None), "370400440532013000");
    }

    #[test]
    fn zfill_pads_only_short_values() {
        assert_eq!(zfill("532013000", 10), "0532013000");
        assert_eq!(zfill("", 3), "000");
        assert_eq!(zfill("12345", 3), "12345");
    }

    #[test]
    fn random_helpers_respect_alphabets() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let digits = random_digits(&mut rng, 32);
        assert_eq!(digits.len(), 32);
        assert!(digits.chars().all(|ch| ch.is_ascii_digit()));
        let letters = random_upper_letters(&mut rng, 32);
        assert!(letters.chars().all(|ch| ch.is_ascii_uppercase()));
        let mixed = random_alphanum_upper(&mut rng, 32);
        assert!(mixed
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit()));
    }
}
