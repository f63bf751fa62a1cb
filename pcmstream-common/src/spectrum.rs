//! Frequency-band analysis for visualization
//!
//! Turns a snapshot of per-bin magnitudes (dB) into normalized band values.
//! Stateless: every call works only on its inputs.

use crate::notes::voice_notes;
use crate::{Error, Result};

/// How bins are grouped into bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandLayout {
    /// One band per native FFT bin
    PerBin,
    /// Bins folded onto the voice-range musical notes (max per note)
    Voice,
}

/// Analysis result; the three vectors have equal length
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumBands {
    /// Band values normalized to [0.0, 1.0]
    pub values: Vec<f32>,
    /// Band center frequencies in Hz
    pub frequencies: Vec<f32>,
    /// Display labels
    pub labels: Vec<String>,
}

/// Normalize a dB magnitude into [0.0, 1.0] between the floor and ceiling
fn normalize(value_db: f32, min_db: f32, max_db: f32) -> f32 {
    ((value_db - min_db) / (max_db - min_db)).clamp(0.0, 1.0)
}

/// Aggregate `magnitudes_db` into bands
///
/// # Arguments
/// * `magnitudes_db` - one magnitude per bin covering 0..Nyquist
/// * `sample_rate` - sample rate of the analyzed signal in Hz
/// * `layout` - band layout
/// * `min_db` / `max_db` - decibel floor and ceiling (floor must be below ceiling)
pub fn analyze(
    magnitudes_db: &[f32],
    sample_rate: u32,
    layout: BandLayout,
    min_db: f32,
    max_db: f32,
) -> Result<SpectrumBands> {
    if min_db >= max_db {
        return Err(Error::InvalidInput(format!(
            "decibel floor {} must be below ceiling {}",
            min_db, max_db
        )));
    }
    if sample_rate == 0 {
        return Err(Error::InvalidInput("sample rate must be positive".to_string()));
    }

    let nyquist = sample_rate as f32 / 2.0;
    let step = if magnitudes_db.is_empty() {
        0.0
    } else {
        nyquist / magnitudes_db.len() as f32
    };

    let (raw, frequencies, labels) = match layout {
        BandLayout::PerBin => {
            let frequencies: Vec<f32> = (0..magnitudes_db.len()).map(|i| step * i as f32).collect();
            let labels = frequencies.iter().map(|f| format!("{:.2} Hz", f)).collect();
            (magnitudes_db.to_vec(), frequencies, labels)
        }
        BandLayout::Voice => {
            let notes = voice_notes();
            let mut aggregate = vec![min_db; notes.len()];
            for (i, &magnitude) in magnitudes_db.iter().enumerate() {
                let freq = step * i as f32;
                // Highest note strictly below this bin's frequency
                if let Some(n) = notes.iter().rposition(|note| freq > note.frequency) {
                    aggregate[n] = aggregate[n].max(magnitude);
                }
            }
            let frequencies = notes.iter().map(|n| n.frequency).collect();
            let labels = notes.iter().map(|n| n.label.clone()).collect();
            (aggregate, frequencies, labels)
        }
    };

    Ok(SpectrumBands {
        values: raw.into_iter().map(|v| normalize(v, min_db, max_db)).collect(),
        frequencies,
        labels,
    })
}
