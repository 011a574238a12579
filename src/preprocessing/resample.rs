//! Sample rate conversion to the internal analysis rate
//!
//! Band-limited sinc interpolation through `rubato`. Content above the output
//! Nyquist frequency is filtered out instead of folding back into the chroma band.
//! The filter's output delay is trimmed so output sample `i` lines up with input
//! time `i / to_rate`.

use crate::error::AnalysisError;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const CHUNK_SIZE: usize = 1024;

fn gcd_u32(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Resample a mono signal
///
/// Returns a copy when the rates already match. The output holds
/// `round(len · to_rate / from_rate)` samples.
///
/// # Arguments
///
/// * `samples` - Mono input samples
/// * `from_rate` - Input sample rate in Hz (must be > 0)
/// * `to_rate` - Output sample rate in Hz (must be > 0)
///
/// # Errors
///
/// `InvalidInput` for a zero rate, `ProcessingError` when the resampler fails
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid sample rates: {} Hz -> {} Hz",
            from_rate, to_rate
        )));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let gcd = gcd_u32(from_rate, to_rate);
    let ratio = (to_rate / gcd) as f64 / (from_rate / gcd) as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
        .map_err(|e| AnalysisError::ProcessingError(format!("Resampler setup failed: {}", e)))?;
    let delay = resampler.output_delay();

    log::debug!(
        "Resampling {} samples from {} Hz to {} Hz ({} samples, delay {})",
        samples.len(),
        from_rate,
        to_rate,
        expected,
        delay
    );

    // Past the end of the input the chunks are zeros; they flush the delay line
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay + CHUNK_SIZE);
    let mut chunk = vec![vec![0.0f32; CHUNK_SIZE]];
    let mut offset = 0usize;
    while output.len() < expected + delay {
        let end = (offset + CHUNK_SIZE).min(samples.len());
        let buf = &mut chunk[0];
        buf.fill(0.0);
        buf[..end - offset].copy_from_slice(&samples[offset..end]);

        let chunk_out = resampler
            .process(&chunk, None)
            .map_err(|e| AnalysisError::ProcessingError(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&chunk_out[0]);
        offset = end;
    }

    output.drain(..delay);
    output.truncate(expected);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sr: u32, seconds: f32) -> Vec<f32> {
        let n = (sr as f32 * seconds) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len().max(1) as f32).sqrt()
    }

    #[test]
    fn test_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 22050, 22050).unwrap(), samples);
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        assert!(matches!(
            resample(&[0.1, 0.2], 0, 22050),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(resample(&[], 44100, 22050).unwrap().is_empty());
    }

    #[test]
    fn test_downsample_length() {
        let samples = sine(440.0, 0.5, 44100, 1.0);
        let out = resample(&samples, 44100, 22050).unwrap();
        assert_eq!(out.len(), 22050);

        let out = resample(&sine(440.0, 0.5, 48000, 0.5), 48000, 22050).unwrap();
        assert_eq!(out.len(), 11025);
    }

    #[test]
    fn test_upsample_keeps_tone() {
        let samples = sine(440.0, 0.5, 11025, 1.0);
        let out = resample(&samples, 11025, 22050).unwrap();
        assert_eq!(out.len(), 22050);
        let crossings = out.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((crossings as i32 - 440).abs() <= 1, "{} crossings", crossings);
        assert!((rms(&out[1000..21000]) - 0.5 / 2f32.sqrt()).abs() < 0.02);
    }

    #[test]
    fn test_preserves_sine_frequency() {
        let samples = sine(220.0, 1.0, 48000, 1.0);
        let out = resample(&samples, 48000, 22050).unwrap();
        let crossings = out.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((crossings as i32 - 220).abs() <= 1, "{} crossings", crossings);
    }

    #[test]
    fn test_output_is_aligned_with_input() {
        let samples = sine(220.0, 1.0, 44100, 1.0);
        let out = resample(&samples, 44100, 22050).unwrap();
        let reference = sine(220.0, 1.0, 22050, 1.0);
        let err: f32 = out[2000..20000]
            .iter()
            .zip(&reference[2000..20000])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max);
        assert!(err < 0.1, "max deviation {}", err);
    }

    #[test]
    fn test_tone_above_output_nyquist_is_removed() {
        // 19 kHz would alias to 3.05 kHz at 22050 Hz, inside the chroma band
        let samples = sine(19000.0, 0.5, 44100, 1.0);
        let out = resample(&samples, 44100, 22050).unwrap();
        assert_eq!(out.len(), 22050);
        let residual = rms(&out[1000..21000]);
        assert!(residual < 0.01, "aliased energy {}", residual);
    }
}
