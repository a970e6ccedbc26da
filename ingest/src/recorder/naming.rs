use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const FILE_ID_LEN: usize = 10;
pub const FILE_EXTENSION: &str = "ogg";

/// Source of recording file names.
///
/// Each server owns one, so the entropy is scoped to it rather than to the process.
pub struct NameGenerator {
    rng: Mutex<StdRng>,
}

impl NameGenerator {
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic names, for tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn next_id(&self, len: usize) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..len)
            .map(|_| LETTERS[rng.random_range(0..LETTERS.len())] as char)
            .collect()
    }

    /// `<10 letters>.ogg`
    pub fn next_file_name(&self) -> String {
        format!("{}.{}", self.next_id(FILE_ID_LEN), FILE_EXTENSION)
    }
}

/// Whether `name` looks like something [`NameGenerator::next_file_name`] produced.
pub fn is_recording_name(name: &str) -> bool {
    match name.strip_suffix(".ogg") {
        Some(id) => id.len() == FILE_ID_LEN && id.bytes().all(|b| b.is_ascii_alphabetic()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_match_pattern() {
        let names = NameGenerator::from_os_rng();
        for _ in 0..100 {
            let name = names.next_file_name();
            assert!(is_recording_name(&name), "{name}");
        }
    }

    #[test]
    fn same_seed_same_names() {
        let a = NameGenerator::from_seed(777);
        let b = NameGenerator::from_seed(777);
        assert_eq!(a.next_file_name(), b.next_file_name());
        assert_eq!(a.next_id(32), b.next_id(32));
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(!is_recording_name("abcdefghij.mp4"));
        assert!(!is_recording_name("abcdefghi.ogg"));
        assert!(!is_recording_name("abcdefghi1.ogg"));
        assert!(is_recording_name("abcdeFGHIJ.ogg"));
    }
}
