//! Band table and per-band energy
//!
//! Groups the non-redundant half of a frame spectrum into contiguous
//! bands that widen toward high frequencies. Mirrored bins (N - k) of a
//! real signal share the band of bin k, so gains broadcast through the
//! table keep the spectrum Hermitian.

use crate::check_len;
use crate::error::{DspError, DspResult};
use crate::FRAME_SIZE;
use rustfft::num_complex::Complex32;

/// Number of bands in the standard table
pub const NB_BANDS: usize = 22;

/// Standard band edges in bins (100 Hz per bin at 48kHz / 480)
pub const BAND_EDGES: [usize; NB_BANDS + 1] = [
    0, 2, 4, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 40, 48, 56, 68, 80, 96, 120, 156, 196, 241,
];

/// Partition of spectrum bins into bands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandTable {
    /// Band edges, `len() == bands + 1`
    edges: Vec<usize>,
    /// Band index of every bin in the full spectrum
    bin_band: Vec<usize>,
    /// Transform length
    fft_size: usize,
}

impl BandTable {
    /// Standard table for `FRAME_SIZE`
    pub fn standard() -> Self {
        Self::build(&BAND_EDGES, FRAME_SIZE)
    }

    /// Validate and build a table for a `fft_size`-point spectrum
    ///
    /// Edges must start at 0, end at `fft_size / 2 + 1` and be strictly
    /// increasing.
    pub fn new(edges: &[usize], fft_size: usize) -> DspResult<Self> {
        if fft_size < 2 {
            return Err(DspError::InvalidBandTable(format!(
                "transform size must be at least 2, got {fft_size}"
            )));
        }
        let half = fft_size / 2 + 1;

        if edges.len() < 2 {
            return Err(DspError::InvalidBandTable(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if edges[0] != 0 {
            return Err(DspError::InvalidBandTable(format!(
                "first edge must be 0, got {}",
                edges[0]
            )));
        }
        if edges[edges.len() - 1] != half {
            return Err(DspError::InvalidBandTable(format!(
                "last edge must be {half}, got {}",
                edges[edges.len() - 1]
            )));
        }
        if let Some(pair) = edges.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(DspError::InvalidBandTable(format!(
                "edges not strictly increasing at {} -> {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self::build(edges, fft_size))
    }

    fn build(edges: &[usize], fft_size: usize) -> Self {
        let mut bin_band = vec![0; fft_size];
        for band in 0..edges.len() - 1 {
            for bin in edges[band]..edges[band + 1] {
                bin_band[bin] = band;
                // Mirror, skipping DC and Nyquist
                let mirror = fft_size - bin;
                if bin > 0 && mirror > bin && mirror < fft_size {
                    bin_band[mirror] = band;
                }
            }
        }

        Self {
            edges: edges.to_vec(),
            bin_band,
            fft_size,
        }
    }

    /// Number of bands
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    /// True if the table has no bands
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Band edges in bins
    pub fn edges(&self) -> &[usize] {
        &self.edges
    }

    /// Transform length the table was built for
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Band index for every bin of the full spectrum
    pub fn bin_bands(&self) -> &[usize] {
        &self.bin_band
    }

    /// Band containing `bin`
    pub fn band_of(&self, bin: usize) -> Option<usize> {
        self.bin_band.get(bin).copied()
    }

    /// Number of bins in `band` on the half spectrum
    pub fn width(&self, band: usize) -> usize {
        self.edges[band + 1] - self.edges[band]
    }

    /// Sum of squared magnitudes per band over the half spectrum
    pub fn band_energy(&self, spectrum: &[Complex32], energy: &mut [f32]) -> DspResult<()> {
        check_len(self.fft_size, spectrum.len())?;
        check_len(self.len(), energy.len())?;

        for (band, e) in energy.iter_mut().enumerate() {
            *e = spectrum[self.edges[band]..self.edges[band + 1]]
                .iter()
                .map(|c| c.norm_sqr())
                .sum();
        }
        Ok(())
    }
}

impl Default for BandTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_standard_table_valid() {
        let table = BandTable::new(&BAND_EDGES, FRAME_SIZE).unwrap();
        assert_eq!(table, BandTable::standard());
        assert_eq!(table.len(), NB_BANDS);

        // Widths never shrink toward high frequencies
        for band in 1..NB_BANDS {
            assert!(table.width(band) >= table.width(band - 1), "band {band}");
        }
    }

    #[test]
    fn test_every_bin_assigned() {
        let table = BandTable::standard();
        assert_eq!(table.bin_bands().len(), FRAME_SIZE);

        for bin in 1..FRAME_SIZE / 2 {
            assert_eq!(table.band_of(bin), table.band_of(FRAME_SIZE - bin));
        }
        assert_eq!(table.band_of(0), Some(0));
        assert_eq!(table.band_of(FRAME_SIZE / 2), Some(NB_BANDS - 1));
        assert_eq!(table.band_of(FRAME_SIZE), None);
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(BandTable::new(&[0], 480).is_err());
        assert!(BandTable::new(&[1, 241], 480).is_err());
        assert!(BandTable::new(&[0, 100, 240], 480).is_err());
        assert!(BandTable::new(&[0, 100, 100, 241], 480).is_err());
        assert!(BandTable::new(&[0, 120, 100, 241], 480).is_err());
        assert!(BandTable::new(&[0, 120, 241], 480).is_ok());
    }

    #[test]
    fn test_rejects_degenerate_transform_size() {
        assert!(matches!(
            BandTable::new(&[0, 1], 0),
            Err(DspError::InvalidBandTable(_))
        ));
        assert!(matches!(
            BandTable::new(&[0, 1], 1),
            Err(DspError::InvalidBandTable(_))
        ));
        let table = BandTable::new(&[0, 2], 2).unwrap();
        assert_eq!(table.band_of(1), Some(0));
    }

    #[test]
    fn test_band_energy_single_bin() {
        let table = BandTable::standard();
        let mut spectrum = vec![Complex32::new(0.0, 0.0); FRAME_SIZE];
        spectrum[21] = Complex32::new(3.0, 4.0);

        let mut energy = [0.0f32; NB_BANDS];
        table.band_energy(&spectrum, &mut energy).unwrap();

        // Bin 21 sits in band 9 (edges 20..24)
        assert_eq!(energy[9], 25.0);
        assert_eq!(energy.iter().sum::<f32>(), 25.0);
    }

    #[test]
    fn test_band_energy_length_mismatch() {
        let table = BandTable::standard();
        let spectrum = vec![Complex32::new(0.0, 0.0); FRAME_SIZE];
        let mut energy = [0.0f32; NB_BANDS - 1];
        assert!(table.band_energy(&spectrum, &mut energy).is_err());
    }

    proptest! {
        #[test]
        fn band_energy_non_negative_and_bounded(
            parts in proptest::collection::vec((-1.0e4f32..1.0e4, -1.0e4f32..1.0e4), FRAME_SIZE)
        ) {
            let table = BandTable::standard();
            let spectrum: Vec<Complex32> =
                parts.iter().map(|&(re, im)| Complex32::new(re, im)).collect();

            let mut energy = [0.0f32; NB_BANDS];
            table.band_energy(&spectrum, &mut energy).unwrap();

            let total: f32 = spectrum.iter().map(|c| c.norm_sqr()).sum();
            let banded: f32 = energy.iter().sum();

            prop_assert!(energy.iter().all(|&e| e >= 0.0));
            prop_assert!(banded <= total * (1.0 + 1e-4));
        }
    }
}
