//! 64-bit snowflake identifiers for chat messages.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// 2024-01-01T00:00:00Z in milliseconds since the Unix epoch.
pub const HUDDLE_EPOCH_MS: u64 = 1_704_067_200_000;

const WORKER_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

struct Clock {
    last_ms: u64,
    sequence: u64,
}

/// Issues strictly increasing message ids for one worker.
///
/// Layout (MSB to LSB): 42 bits of milliseconds since [`HUDDLE_EPOCH_MS`],
/// 10 bits of worker id, 12 bits of per-millisecond sequence.
///
/// A wall clock that steps backwards does not stall or panic the generator:
/// it keeps counting from the last millisecond it observed until real time
/// catches up again.
pub struct MessageIdGenerator {
    worker_id: u64,
    clock: Mutex<Clock>,
}

impl MessageIdGenerator {
    /// Returns `None` when `worker_id` does not fit in 10 bits.
    pub fn new(worker_id: u16) -> Option<Self> {
        if worker_id > MAX_WORKER_ID {
            return None;
        }
        Some(Self {
            worker_id: u64::from(worker_id),
            clock: Mutex::new(Clock {
                last_ms: 0,
                sequence: 0,
            }),
        })
    }

    pub fn next_id(&self) -> i64 {
        let mut clock = self.clock.lock();
        let now_ms = now_ms().max(clock.last_ms);

        if now_ms == clock.last_ms {
            clock.sequence = (clock.sequence + 1) & SEQUENCE_MASK;
            if clock.sequence == 0 {
                // Sequence space for this millisecond is spent; borrow the next one.
                clock.last_ms += 1;
            }
        } else {
            clock.sequence = 0;
            clock.last_ms = now_ms;
        }

        let elapsed = clock.last_ms.saturating_sub(HUDDLE_EPOCH_MS);
        ((elapsed << (WORKER_BITS + SEQUENCE_BITS)) | (self.worker_id << SEQUENCE_BITS) | clock.sequence)
            as i64
    }
}

/// Milliseconds since the Unix epoch encoded in a message id.
pub fn id_timestamp_ms(id: i64) -> u64 {
    ((id as u64) >> (WORKER_BITS + SEQUENCE_BITS)) + HUDDLE_EPOCH_MS
}

/// Worker id encoded in a message id.
pub fn id_worker(id: i64) -> u16 {
    (((id as u64) >> SEQUENCE_BITS) & u64::from(MAX_WORKER_ID)) as u16
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(HUDDLE_EPOCH_MS)
}
