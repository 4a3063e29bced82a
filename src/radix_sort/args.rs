//! Sort configuration, per-pass constant block and the buffer set of one sort.

use crate::buffer::Buffer;
use crate::error::{Result, SortError};

/// Width of a key in bits.
pub const KEY_BITS: u32 = 32;
pub const DEFAULT_BITS_PER_RADIX: u32 = 8;
pub const DEFAULT_BATCH_SIZE: usize = 1024;
/// Largest digit width; keeps the count table allocatable.
pub const MAX_BITS_PER_RADIX: u32 = 16;

/// Set on the first pass: read keys from the original input.
pub const FLAGS_IS_FIRST_PASS: u32 = 1 << 0;
/// Set in ordering mode: permute indices instead of keys.
pub const FLAGS_OUTPUT_ORDERING: u32 = 1 << 1;

/// Words in the constant block.
pub const CONSTANT_WORDS: usize = 8;

/// Shape of a radix sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    /// Significant key bits; higher bits of a key are ignored.
    pub key_bits: u32,
    pub bits_per_radix: u32,
    /// Elements per batch; also the lane count of the per-batch kernels.
    pub batch_size: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key_bits: KEY_BITS,
            bits_per_radix: DEFAULT_BITS_PER_RADIX,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl SortConfig {
    pub fn validate(&self) -> Result<()> {
        if self.key_bits == 0 || self.key_bits > KEY_BITS {
            return Err(SortError::InvalidConfig(format!(
                "key width must be 1..={KEY_BITS} bits, got {}",
                self.key_bits
            )));
        }
        if self.bits_per_radix == 0 || self.bits_per_radix > MAX_BITS_PER_RADIX {
            return Err(SortError::InvalidConfig(format!(
                "bits per radix must be 1..={MAX_BITS_PER_RADIX}, got {}",
                self.bits_per_radix
            )));
        }
        if self.key_bits % self.bits_per_radix != 0 {
            return Err(SortError::InvalidConfig(format!(
                "bits per radix ({}) must divide the key width ({})",
                self.bits_per_radix, self.key_bits
            )));
        }
        if self.batch_size == 0 {
            return Err(SortError::InvalidConfig(
                "batch size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of distinct digit values.
    pub fn radix_counts(&self) -> usize {
        1 << self.bits_per_radix
    }

    pub fn radix_mask(&self) -> u32 {
        (self.radix_counts() - 1) as u32
    }

    /// Passes needed to sort by every digit.
    pub fn radix_iterations(&self) -> u32 {
        self.key_bits / self.bits_per_radix
    }

    pub fn batch_count(&self, n: usize) -> usize {
        n.div_ceil(self.batch_size)
    }
}

/// Per-pass constants, laid out as
/// `[n, batch_count, radix_mask, radix_shift, batch_size, flags, reserved, reserved]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassConstants {
    pub input_count: u32,
    pub batch_count: u32,
    pub radix_mask: u32,
    pub radix_shift: u32,
    pub batch_size: u32,
    pub flags: u32,
}

impl PassConstants {
    pub fn to_words(&self) -> [u32; CONSTANT_WORDS] {
        [
            self.input_count,
            self.batch_count,
            self.radix_mask,
            self.radix_shift,
            self.batch_size,
            self.flags,
            0,
            0,
        ]
    }

    pub fn from_words(words: &[u32; CONSTANT_WORDS]) -> Self {
        Self {
            input_count: words[0],
            batch_count: words[1],
            radix_mask: words[2],
            radix_shift: words[3],
            batch_size: words[4],
            flags: words[5],
        }
    }

    /// Read the block back from a constant buffer.
    pub fn load(buffer: &Buffer) -> Self {
        let mut words = [0u32; CONSTANT_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = buffer.load(i);
        }
        Self::from_words(&words)
    }

    pub fn is_first_pass(&self) -> bool {
        self.flags & FLAGS_IS_FIRST_PASS != 0
    }

    pub fn output_ordering(&self) -> bool {
        self.flags & FLAGS_OUTPUT_ORDERING != 0
    }

    pub fn radix_counts(&self) -> usize {
        self.radix_mask as usize + 1
    }

    #[inline]
    pub fn digit(&self, key: u32) -> usize {
        ((key >> self.radix_shift) & self.radix_mask) as usize
    }
}

/// Every buffer one sort needs, allocated once by [`allocate`] and reused by
/// each pass.
#[derive(Debug)]
pub struct SortArgs {
    pub(crate) config: SortConfig,
    pub(crate) input_count: usize,
    pub(crate) output_ordering: bool,
    /// length `n`: rank of each element among same-digit elements of its batch
    pub(crate) local_offsets: Buffer,
    /// length `n`
    pub(crate) ping: Buffer,
    /// length `n`
    pub(crate) pong: Buffer,
    /// `batch_count × radix_counts`, cell (b, d) at `d * batch_count + b`
    pub(crate) count_table: Buffer,
    /// same shape as `count_table`: exclusive prefix over batches per digit
    pub(crate) batch_prefix: Buffer,
    /// length `radix_counts`: elements per digit
    pub(crate) radix_totals: Buffer,
    /// length `radix_counts`: exclusive prefix of `radix_totals`
    pub(crate) global_offsets: Buffer,
    /// `CONSTANT_WORDS` words
    pub(crate) constants: Buffer,
}

impl SortArgs {
    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_ordering(&self) -> bool {
        self.output_ordering
    }

    pub fn batch_count(&self) -> usize {
        self.config.batch_count(self.input_count)
    }

    pub fn local_offsets(&self) -> &Buffer {
        &self.local_offsets
    }

    pub fn count_table(&self) -> &Buffer {
        &self.count_table
    }

    pub fn batch_prefix_table(&self) -> &Buffer {
        &self.batch_prefix
    }

    pub fn radix_totals(&self) -> &Buffer {
        &self.radix_totals
    }

    pub fn global_digit_table(&self) -> &Buffer {
        &self.global_offsets
    }

    pub fn constants(&self) -> &Buffer {
        &self.constants
    }

    pub fn ping(&self) -> &Buffer {
        &self.ping
    }

    pub fn pong(&self) -> &Buffer {
        &self.pong
    }
}

/// Size and allocate the buffers for sorting `n` keys.
///
/// With `output_ordering` the sort produces a permutation of `0..n` instead
/// of the sorted keys.
pub fn allocate(config: &SortConfig, n: usize, output_ordering: bool) -> Result<SortArgs> {
    config.validate()?;
    if u32::try_from(n).is_err() {
        return Err(SortError::InvalidConfig(format!(
            "{n} elements do not fit the 32-bit constant block"
        )));
    }
    let batch_count = config.batch_count(n);
    let table_len = batch_count
        .checked_mul(config.radix_counts())
        .ok_or_else(|| SortError::InvalidConfig("count table size overflows".to_string()))?;

    Ok(SortArgs {
        config: *config,
        input_count: n,
        output_ordering,
        local_offsets: Buffer::new("localOffsetsBuffer", n),
        ping: Buffer::new("pingBuffer", n),
        pong: Buffer::new("pongBuffer", n),
        count_table: Buffer::new("countTableBuffer", table_len),
        batch_prefix: Buffer::new("countTableBatchPrefixBuffer", table_len),
        radix_totals: Buffer::new("radixTotalCounts", config.radix_counts()),
        global_offsets: Buffer::new("globalDigitTable", config.radix_counts()),
        constants: Buffer::new("sortConstants", CONSTANT_WORDS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SortConfig::default();
        config.validate().unwrap();
        assert_eq!(config.radix_counts(), 256);
        assert_eq!(config.radix_mask(), 0xFF);
        assert_eq!(config.radix_iterations(), 4);
        assert_eq!(config.batch_count(0), 0);
        assert_eq!(config.batch_count(1), 1);
        assert_eq!(config.batch_count(1024), 1);
        assert_eq!(config.batch_count(1025), 2);
    }

    #[test]
    fn test_invalid_configs() {
        let bad = [
            SortConfig { key_bits: 0, ..SortConfig::default() },
            SortConfig { key_bits: 33, ..SortConfig::default() },
            SortConfig { bits_per_radix: 0, ..SortConfig::default() },
            SortConfig { bits_per_radix: 5, ..SortConfig::default() },
            SortConfig { key_bits: 32, bits_per_radix: 32, ..SortConfig::default() },
            SortConfig { batch_size: 0, ..SortConfig::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SortError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_constant_block_layout() {
        let constants = PassConstants {
            input_count: 5000,
            batch_count: 5,
            radix_mask: 0xFF,
            radix_shift: 16,
            batch_size: 1024,
            flags: FLAGS_OUTPUT_ORDERING,
        };
        let words = constants.to_words();
        assert_eq!(words, [5000, 5, 0xFF, 16, 1024, FLAGS_OUTPUT_ORDERING, 0, 0]);
        assert_eq!(PassConstants::from_words(&words), constants);

        let buffer = Buffer::from_slice("sortConstants", &words);
        let loaded = PassConstants::load(&buffer);
        assert!(loaded.output_ordering());
        assert!(!loaded.is_first_pass());
        assert_eq!(loaded.digit(0x00AB_0000), 0xAB);
        assert_eq!(loaded.radix_counts(), 256);
    }

    #[test]
    fn test_allocate_shapes() {
        let args = allocate(&SortConfig::default(), 3000, true).unwrap();
        assert_eq!(args.batch_count(), 3);
        assert_eq!(args.local_offsets().len(), 3000);
        assert_eq!(args.ping().len(), 3000);
        assert_eq!(args.pong().len(), 3000);
        assert_eq!(args.count_table().len(), 3 * 256);
        assert_eq!(args.batch_prefix_table().len(), 3 * 256);
        assert_eq!(args.radix_totals().len(), 256);
        assert_eq!(args.global_digit_table().len(), 256);
        assert_eq!(args.constants().len(), CONSTANT_WORDS);
        assert!(args.output_ordering());
    }

    #[test]
    fn test_allocate_empty() {
        let args = allocate(&SortConfig::default(), 0, false).unwrap();
        assert_eq!(args.batch_count(), 0);
        assert!(args.count_table().is_empty());
        assert!(args.ping().is_empty());
    }

    #[test]
    fn test_allocate_rejects_invalid_config() {
        let config = SortConfig {
            bits_per_radix: 3,
            ..SortConfig::default()
        };
        assert!(allocate(&config, 10, false).is_err());
    }
}
