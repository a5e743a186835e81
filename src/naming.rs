use chrono::{DateTime, Utc};
use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const GROUP_COUNT: usize = 3;
const GROUP_LEN: usize = 6;
const EXTENSION: &str = "txt";

/// Generate a blob name like `20250101120000-a1b2c3-d4e5f6-g7h8i9.txt`.
///
/// The UTC timestamp prefix keeps names sortable per second; the three random
/// groups make collisions within the same second vanishingly unlikely.
pub fn generate_filename() -> String {
    generate_filename_with(Utc::now(), &mut rand::thread_rng())
}

pub fn generate_filename_with<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let groups: Vec<String> = (0..GROUP_COUNT).map(|_| random_group(rng)).collect();
    format!("{}-{}.{}", now.format("%Y%m%d%H%M%S"), groups.join("-"), EXTENSION)
}

fn random_group<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..GROUP_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
