use rand::{Rng, distributions::Alphanumeric, thread_rng};

/// Length of the pool session token handed to clients.
pub const POOL_TOKEN_LENGTH: usize = 32;

pub fn generate_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
