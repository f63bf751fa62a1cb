//! Musical note frequency table
//!
//! Octaves 1 through 8, twelve equal-tempered notes each, derived from the
//! octave-8 frequencies by halving once per octave.

use std::sync::OnceLock;

/// Octave 8 reference frequencies (C8 through B8) in Hz
const OCTAVE_8_FREQUENCIES: [f32; 12] = [
    4186.01, 4434.92, 4698.63, 4978.03, 5274.04, 5587.65, 5919.91, 6271.93, 6644.88, 7040.0,
    7458.62, 7902.13,
];

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Lower bound (exclusive) of the voice range in Hz
pub const VOICE_MIN_HZ: f32 = 32.0;
/// Upper bound (exclusive) of the voice range in Hz
pub const VOICE_MAX_HZ: f32 = 2000.0;

/// One note of the table
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Label such as `A4` or `C#3`
    pub label: String,
    /// Frequency in Hz
    pub frequency: f32,
}

/// All 96 notes from C1 to B8, ascending
pub fn note_table() -> &'static [Note] {
    static TABLE: OnceLock<Vec<Note>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut notes = Vec::with_capacity(8 * 12);
        for octave in 1..=8u32 {
            let divisor = 2f32.powi((8 - octave) as i32);
            for (name, base) in NOTE_NAMES.iter().zip(OCTAVE_8_FREQUENCIES.iter()) {
                notes.push(Note {
                    label: format!("{}{}", name, octave),
                    frequency: base / divisor,
                });
            }
        }
        notes
    })
}

/// Notes strictly between 32 Hz and 2000 Hz
pub fn voice_notes() -> &'static [Note] {
    static VOICE: OnceLock<Vec<Note>> = OnceLock::new();
    VOICE.get_or_init(|| {
        note_table()
            .iter()
            .filter(|n| n.frequency > VOICE_MIN_HZ && n.frequency < VOICE_MAX_HZ)
            .cloned()
            .collect()
    })
}
