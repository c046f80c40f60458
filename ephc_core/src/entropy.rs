//! Entropy coder interface and the bundled range-ANS implementation.
//!
//! The frame layer (`frame.rs`) only sees [`EncodedSignal`]: a finalization
//! state, the symbol table, and the coded 32-bit words. Anything that can
//! produce and consume that shape can stand in for [`RansCoder`].

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::signal::Sample;

/// Lower bound of the normalized coder state interval `[L, L << 32)`.
pub const RANS_L: u64 = 1 << 31;

/// Smallest probability scale (`log2` of the symbol count total).
pub const MIN_SCALE_BITS: u32 = 16;

/// Largest probability scale the 64-bit state supports.
pub const MAX_SCALE_BITS: u32 = 31;

/// Everything needed to decode a symbol sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSignal<T> {
    pub state: u64,
    /// Normalized counts; their sum is a power of two.
    pub symbol_counts: Vec<u32>,
    /// Distinct symbols, ascending, parallel to `symbol_counts`.
    pub symbol_values: Vec<T>,
    pub words: Vec<u32>,
    pub signal_length: u32,
}

/// Opaque encode/decode primitive over integer symbols.
pub trait EntropyCoder: Send + Sync {
    fn encode<T: Sample>(&self, symbols: &[T]) -> Result<EncodedSignal<T>>;
    fn decode<T: Sample>(&self, encoded: &EncodedSignal<T>) -> Result<Vec<T>>;
}

/// Static-model rANS with a 64-bit state and 32-bit renormalization words.
#[derive(Debug, Clone, Copy)]
pub struct RansCoder {
    /// Minimum `log2` of the normalized count total.
    pub min_scale_bits: u32,
}

impl Default for RansCoder {
    fn default() -> Self {
        Self {
            min_scale_bits: MIN_SCALE_BITS,
        }
    }
}

impl RansCoder {
    /// Scale large enough that every symbol gets a count of at least one with headroom.
    fn scale_bits_for(&self, alphabet: usize) -> Result<u32> {
        let needed = (alphabet as u64 * 2).next_power_of_two().trailing_zeros();
        let bits = needed.max(self.min_scale_bits.min(MAX_SCALE_BITS));
        if bits > MAX_SCALE_BITS {
            return Err(Error::codec(
                "rans",
                format!("alphabet of {alphabet} symbols exceeds the coder's precision"),
            ));
        }
        Ok(bits)
    }
}

impl EntropyCoder for RansCoder {
    fn encode<T: Sample>(&self, symbols: &[T]) -> Result<EncodedSignal<T>> {
        let signal_length = u32::try_from(symbols.len())
            .map_err(|_| Error::codec("rans", "signal longer than u32::MAX samples"))?;
        if symbols.is_empty() {
            return Ok(EncodedSignal {
                state: RANS_L,
                symbol_counts: Vec::new(),
                symbol_values: Vec::new(),
                words: Vec::new(),
                signal_length,
            });
        }

        let mut histogram: BTreeMap<T, u64> = BTreeMap::new();
        for &s in symbols {
            *histogram.entry(s).or_insert(0) += 1;
        }
        let symbol_values: Vec<T> = histogram.keys().copied().collect();
        let freqs: Vec<u64> = histogram.values().copied().collect();

        let scale_bits = self.scale_bits_for(symbol_values.len())?;
        let symbol_counts = normalize_counts(&freqs, 1u64 << scale_bits);
        let starts = cumulative(&symbol_counts);

        let mut x = RANS_L;
        let mut words = Vec::new();
        for &s in symbols.iter().rev() {
            let i = symbol_values
                .binary_search(&s)
                .map_err(|_| Error::codec("rans", "symbol missing from its own table"))?;
            let freq = u64::from(symbol_counts[i]);
            let x_max = ((RANS_L >> scale_bits) << 32) * freq;
            if x >= x_max {
                words.push(x as u32);
                x >>= 32;
            }
            x = ((x / freq) << scale_bits) + (x % freq) + starts[i];
        }
        words.reverse();

        Ok(EncodedSignal {
            state: x,
            symbol_counts,
            symbol_values,
            words,
            signal_length,
        })
    }

    fn decode<T: Sample>(&self, encoded: &EncodedSignal<T>) -> Result<Vec<T>> {
        let n = encoded.signal_length as usize;
        if n == 0 {
            return Ok(Vec::new());
        }
        let counts = &encoded.symbol_counts;
        if counts.len() != encoded.symbol_values.len() {
            return Err(Error::corrupt(
                "mismatch between number of symbol counts and symbol values",
            ));
        }
        if counts.is_empty() || counts.contains(&0) {
            return Err(Error::corrupt("symbol table is empty or has zero counts"));
        }
        let total: u64 = counts.iter().map(|&c| u64::from(c)).sum();
        if !total.is_power_of_two() || total > (1u64 << MAX_SCALE_BITS) {
            return Err(Error::corrupt(format!(
                "symbol counts sum to {total}, not a supported power of two"
            )));
        }
        let scale_bits = total.trailing_zeros();
        let mask = total - 1;
        let starts = cumulative(counts);

        let mut x = encoded.state;
        if x < RANS_L {
            return Err(Error::corrupt("coder state below the normalization bound"));
        }
        let mut words = encoded.words.iter();
        // the declared length is untrusted until the words run out
        let mut out = Vec::with_capacity(n.min(encoded.words.len().saturating_mul(2) + 64));
        for _ in 0..n {
            let slot = x & mask;
            let i = starts.partition_point(|&s| s <= slot) - 1;
            out.push(encoded.symbol_values[i]);
            x = u64::from(counts[i]) * (x >> scale_bits) + slot - starts[i];
            if x < RANS_L {
                let w = words
                    .next()
                    .ok_or_else(|| Error::corrupt("coded words exhausted before signal end"))?;
                x = (x << 32) | u64::from(*w);
            }
        }
        if words.next().is_some() {
            return Err(Error::corrupt("coded words left over after signal end"));
        }
        if x != RANS_L {
            return Err(Error::corrupt(format!(
                "final coder state {x:#x} does not return to the initial state"
            )));
        }
        Ok(out)
    }
}

fn cumulative(counts: &[u32]) -> Vec<u64> {
    let mut acc = 0u64;
    counts
        .iter()
        .map(|&c| {
            let start = acc;
            acc += u64::from(c);
            start
        })
        .collect()
}

/// Scale raw frequencies to integer counts summing to `total`, each at least one.
fn normalize_counts(freqs: &[u64], total: u64) -> Vec<u32> {
    let sum: u64 = freqs.iter().sum();
    let mut counts: Vec<u64> = freqs
        .iter()
        .map(|&f| ((u128::from(f) * u128::from(total) / u128::from(sum)) as u64).max(1))
        .collect();
    let mut assigned: u64 = counts.iter().sum();

    while assigned != total {
        let (largest, _) = counts
            .iter()
            .enumerate()
            .max_by_key(|&(_, &c)| c)
            .unwrap_or((0, &0));
        if assigned < total {
            counts[largest] += total - assigned;
            assigned = total;
        } else {
            let take = (assigned - total).min(counts[largest] - 1);
            counts[largest] -= take;
            assigned -= take;
        }
    }
    counts.into_iter().map(|c| c as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_counts_sum_to_total_and_stay_positive() {
        let freqs = [1_000_000, 1, 1, 1, 3, 7];
        let counts = normalize_counts(&freqs, 1 << 16);
        assert_eq!(counts.iter().map(|&c| u64::from(c)).sum::<u64>(), 1 << 16);
        assert!(counts.iter().all(|&c| c >= 1));
    }

    #[test]
    fn single_symbol_takes_whole_range() {
        assert_eq!(normalize_counts(&[42], 1 << 16), vec![1 << 16]);
    }

    fn sample_stream() -> EncodedSignal<i16> {
        let symbols: Vec<i16> = (0..5_000i32).map(|i| ((i * 37 % 101) - 50) as i16).collect();
        RansCoder::default().encode(&symbols).unwrap()
    }

    #[test]
    fn corrupted_word_is_detected() {
        let coder = RansCoder::default();
        let clean = sample_stream();
        assert!(clean.words.len() > 4);
        assert_eq!(coder.decode(&clean).unwrap().len(), 5_000);

        for k in [0, clean.words.len() / 2, clean.words.len() - 1] {
            let mut bad = clean.clone();
            bad.words[k] ^= 0x0001_0000;
            assert!(
                matches!(coder.decode(&bad), Err(Error::CorruptHeader(_))),
                "flipped word {k}"
            );
        }
    }

    #[test]
    fn unused_words_and_wrong_state_are_detected() {
        let coder = RansCoder::default();
        let mut extra = sample_stream();
        extra.words.push(0xDEAD_BEEF);
        assert!(matches!(coder.decode(&extra), Err(Error::CorruptHeader(_))));

        let mut shifted = sample_stream();
        shifted.state += 1;
        assert!(matches!(coder.decode(&shifted), Err(Error::CorruptHeader(_))));
    }

    #[test]
    fn oversized_length_fails_without_huge_allocation() {
        let mut bad = sample_stream();
        bad.signal_length = u32::MAX;
        assert!(matches!(
            RansCoder::default().decode(&bad),
            Err(Error::CorruptHeader(_))
        ));
    }

    #[test]
    fn scale_grows_with_alphabet() {
        let coder = RansCoder::default();
        assert_eq!(coder.scale_bits_for(3).unwrap(), 16);
        assert_eq!(coder.scale_bits_for(70_000).unwrap(), 18);
    }
}
