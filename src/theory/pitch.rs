//! Pitch-class arithmetic

/// Pitch class (0 = C, 1 = C#, ..., 11 = B)
pub type PitchClass = u8;

/// Note names with sharp spelling, indexed by pitch class
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Fold any integer onto a pitch class in `[0, 11]`
///
/// Negative inputs are normalized, so `to_pc(-1) == 11`.
///
/// # Example
///
/// ```
/// use chordline::theory::to_pc;
///
/// assert_eq!(to_pc(14), 2);
/// assert_eq!(to_pc(-1), 11);
/// assert_eq!(to_pc(to_pc(-25) as i32), to_pc(-25));
/// ```
pub fn to_pc(n: i32) -> PitchClass {
    n.rem_euclid(12) as PitchClass
}

/// Pitch class `semitones` above `pc`
pub fn transpose(pc: PitchClass, semitones: i32) -> PitchClass {
    to_pc(pc as i32 + semitones)
}

/// Ascending interval from `from` to `to` in semitones (0-11)
pub fn interval(from: PitchClass, to: PitchClass) -> u8 {
    to_pc(to as i32 - from as i32)
}

/// Shortest chromatic distance between two pitch classes (0-6)
pub fn chromatic_distance(a: PitchClass, b: PitchClass) -> u8 {
    let d = interval(a, b);
    d.min(12 - d)
}

/// Shortest distance between two pitch classes on the circle of fifths (0-6)
pub fn fifths_distance(a: PitchClass, b: PitchClass) -> u8 {
    // Multiplying by 7 (a fifth) maps chromatic steps onto circle-of-fifths steps
    let steps = (interval(a, b) as u32 * 7 % 12) as u8;
    steps.min(12 - steps)
}

/// Sharp-spelled note name of a pitch class
pub fn note_name(pc: PitchClass) -> &'static str {
    NOTE_NAMES[pc as usize % 12]
}

/// Fractional MIDI note number of a frequency (A4 = 440 Hz = 69)
pub fn frequency_to_midi(frequency_hz: f32) -> f32 {
    69.0 + 12.0 * (frequency_hz / 440.0).log2()
}

/// Pitch class of the nearest equal-tempered note to a frequency
pub fn frequency_to_pc(frequency_hz: f32) -> PitchClass {
    to_pc(frequency_to_midi(frequency_hz).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pc_closure() {
        for n in -100..100 {
            let pc = to_pc(n);
            assert!(pc < 12, "to_pc({}) = {} out of range", n, pc);
            assert_eq!(to_pc(pc as i32), pc, "to_pc must be idempotent for {}", n);
            assert_eq!(pc as i32, ((n % 12) + 12) % 12);
        }
        assert_eq!(to_pc(i32::MIN), to_pc(i32::MIN % 12));
    }

    #[test]
    fn test_distances() {
        assert_eq!(fifths_distance(0, 7), 1); // C-G
        assert_eq!(fifths_distance(0, 5), 1); // C-F
        assert_eq!(fifths_distance(0, 2), 2); // C-D
        assert_eq!(fifths_distance(0, 6), 6); // tritone
        assert_eq!(chromatic_distance(0, 11), 1);
        assert_eq!(chromatic_distance(2, 9), 5);
        assert_eq!(interval(7, 0), 5);
    }

    #[test]
    fn test_frequency_to_pc() {
        assert_eq!(frequency_to_pc(440.0), 9);
        assert_eq!(frequency_to_pc(110.0), 9);
        assert_eq!(frequency_to_pc(261.63), 0);
        assert_eq!(frequency_to_pc(392.0), 7);
        assert!((frequency_to_midi(261.63) - 60.0).abs() < 0.01);
    }
}
