//! Decoder state space for one key

use crate::analysis::result::Key;
use crate::config::TheoryConfig;
use crate::theory::chord::{Chord, Provenance};
use crate::theory::scale::{borrowed_chords, diatonic_triads, secondary_dominants};

/// One hidden state: a chord with its theory category and unit-norm template
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderState {
    /// Chord (root position triad)
    pub chord: Chord,
    /// Category relative to the key
    pub provenance: Provenance,
    /// L2-normalized root/third/fifth template
    pub template: [f32; 12],
}

impl DecoderState {
    fn new(chord: Chord, provenance: Provenance) -> Self {
        Self {
            chord,
            provenance,
            template: chord.triad_template(),
        }
    }

    /// True for the seven diatonic triads
    pub fn is_diatonic(&self) -> bool {
        self.provenance == Provenance::Diatonic
    }
}

/// Build the state space: diatonic triads, secondary dominants and (unless
/// `conservative`) the borrowed chords of the key's mode
pub fn build_states(key: &Key, theory: &TheoryConfig, conservative: bool) -> Vec<DecoderState> {
    let mut states: Vec<DecoderState> = diatonic_triads(key)
        .into_iter()
        .map(|c| DecoderState::new(c, Provenance::Diatonic))
        .collect();

    let mut push = |chord: Chord, provenance: Provenance| {
        if !states.iter().any(|s| s.chord == chord) {
            states.push(DecoderState::new(chord, provenance));
        }
    };
    for chord in secondary_dominants(key) {
        push(chord, Provenance::SecondaryDominant);
    }
    if !conservative {
        for chord in borrowed_chords(key, theory) {
            push(chord, Provenance::Borrowed);
        }
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_state_space() {
        let key = Key::new(0, false, 0.9);
        let theory = TheoryConfig::default();
        let full = build_states(&key, &theory, false);
        let conservative = build_states(&key, &theory, true);

        assert_eq!(full.iter().filter(|s| s.is_diatonic()).count(), 7);
        assert_eq!(full.len(), 7 + 4 + 4);
        assert_eq!(conservative.len(), 7 + 4);
        assert!(conservative.iter().all(|s| s.provenance != Provenance::Borrowed));
        assert_eq!(full[0].chord.label(), "C");
    }
}
