/// Logical CPU identifiers and CPU set bookkeeping.
///
/// Handles:
/// - The `CpuId` type and the supported id range
/// - Fixed-size CPU bitmasks used by the online-set tracker

pub mod online;
pub mod pin;

/// Logical CPU identifier (0 to `MAX_CPUS` - 1).
pub type CpuId = u32;

/// Maximum number of logical CPUs the surface can address.
pub const MAX_CPUS: usize = 256;

const WORD_BITS: usize = 64;
const MASK_WORDS: usize = MAX_CPUS / WORD_BITS;

/// Fixed-size bitmask over logical CPU ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuMask {
    words: [u64; MASK_WORDS],
}

impl CpuMask {
    pub const fn new() -> Self {
        CpuMask {
            words: [0; MASK_WORDS],
        }
    }

    /// Whether `cpu` is set. Ids outside the supported range are never set.
    pub fn contains(&self, cpu: CpuId) -> bool {
        let cpu = cpu as usize;
        if cpu >= MAX_CPUS {
            return false;
        }
        self.words[cpu / WORD_BITS] & (1 << (cpu % WORD_BITS)) != 0
    }

    /// Sets `cpu`. Returns false if it was already set or out of range.
    pub fn insert(&mut self, cpu: CpuId) -> bool {
        let idx = cpu as usize;
        if idx >= MAX_CPUS || self.contains(cpu) {
            return false;
        }
        self.words[idx / WORD_BITS] |= 1 << (idx % WORD_BITS);
        true
    }

    /// Clears `cpu`. Returns false if it was not set.
    pub fn remove(&mut self, cpu: CpuId) -> bool {
        if !self.contains(cpu) {
            return false;
        }
        let idx = cpu as usize;
        self.words[idx / WORD_BITS] &= !(1 << (idx % WORD_BITS));
        true
    }

    /// Number of set ids.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Iterates over set ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CpuId> + '_ {
        (0..MAX_CPUS as CpuId).filter(move |cpu| self.contains(*cpu))
    }
}

impl Default for CpuMask {
    fn default() -> Self {
        Self::new()
    }
}
