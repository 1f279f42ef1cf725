use rand::{Rng, distributions::Alphanumeric};

/// Generates a random alphanumeric string of the specified length.
///
/// Characters are drawn from `rand::thread_rng()`, a cryptographically secure
/// generator, so the output is suitable for session identifiers and
/// remember-me secrets.
///
/// # Arguments
///
/// * `length` - The desired length of the generated string
pub fn generate_random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
