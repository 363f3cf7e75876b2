// Snowflake-like ID generator
// Ids are generated by the application so that, within one process, id order
// follows creation order even when two rows share a millisecond timestamp.

use std::sync::Mutex;

use crate::core::current_time_millis;
use crate::error::{AppError, AppResult};

const SHARD_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_SHARD: u16 = 1 << SHARD_BITS;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// 64-bit ID format: [timestamp:42][shard_id:10][sequence:12]
/// This allows for 1024 shards and 4096 IDs per millisecond per shard
#[derive(Debug)]
pub struct IdGenerator {
    shard_id: u16,
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

impl IdGenerator {
    /// Create new ID generator for given shard
    pub fn new(shard_id: u16) -> AppResult<Self> {
        if shard_id >= MAX_SHARD {
            return Err(AppError::ConfigurationError(format!(
                "Shard ID must be less than {}, got {}",
                MAX_SHARD, shard_id
            )));
        }

        Ok(Self {
            shard_id,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    /// Generate next unique ID. Strictly increasing for a given generator.
    pub fn next_id(&self) -> i64 {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = current_time_millis().max(0) as u64;
        // A clock that steps backwards keeps issuing from the last seen millisecond
        let mut timestamp = now.max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            if state.sequence >= MAX_SEQUENCE {
                // Sequence exhausted: borrow the next millisecond
                timestamp += 1;
                state.sequence = 0;
            } else {
                state.sequence += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        (((timestamp & 0x3FF_FFFF_FFFF) << (SHARD_BITS + SEQUENCE_BITS))
            | ((self.shard_id as u64) << SEQUENCE_BITS)
            | (state.sequence & MAX_SEQUENCE)) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_of(id: i64) -> u16 {
        (((id as u64) >> SEQUENCE_BITS) & (MAX_SHARD as u64 - 1)) as u16
    }

    #[test]
    fn test_id_generation() {
        let generator = IdGenerator::new(123).unwrap();

        let id1 = generator.next_id();
        let id2 = generator.next_id();
        let id3 = generator.next_id();

        assert!(id1 < id2);
        assert!(id2 < id3);

        assert_eq!(shard_of(id1), 123);
        assert_eq!(shard_of(id2), 123);
        assert_eq!(shard_of(id3), 123);
    }

    #[test]
    fn test_ids_are_monotonic_under_burst() {
        let generator = IdGenerator::new(1).unwrap();
        let ids: Vec<i64> = (0..10_000).map(|_| generator.next_id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|id| *id > 0));
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let generator = std::sync::Arc::new(IdGenerator::new(7).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || (0..2_000).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_shard_bounds() {
        let generator = IdGenerator::new(500).unwrap();
        let id = generator.next_id();
        assert_eq!(shard_of(id), 500);

        assert!(IdGenerator::new(1024).is_err());
    }
}
