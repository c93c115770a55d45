use super::backend::AudioFrame;

/// Convert a captured frame to the format the live service expects:
/// fold to mono first (decimating interleaved samples would mix channels),
/// then resample.
pub fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.channels != target_channels && target_channels == 1 {
        processed = to_mono(processed);
    }

    if processed.sample_rate != target_sample_rate {
        processed = resample(processed, target_sample_rate);
    }

    processed
}

/// Fold interleaved channels to mono by averaging each frame group. The mean
/// keeps levels intact where a plain sum of channels would clip.
fn to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels <= 1 {
        return frame;
    }

    let channels = frame.channels as usize;
    let mut mono = Vec::with_capacity(frame.samples.len() / channels);

    for group in frame.samples.chunks_exact(channels) {
        let sum: f32 = group.iter().sum();
        mono.push(sum / channels as f32);
    }

    AudioFrame {
        samples: mono,
        sample_rate: frame.sample_rate,
        channels: 1,
        source: frame.source,
    }
}

/// Resample by linear interpolation between neighboring input samples.
/// Handles non-integer ratios (44.1kHz -> 16kHz). Speech-grade fidelity.
fn resample(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if frame.sample_rate == target_rate || frame.samples.is_empty() {
        return AudioFrame {
            sample_rate: target_rate,
            ..frame
        };
    }

    let ratio = target_rate as f64 / frame.sample_rate as f64;
    let output_len = (frame.samples.len() as f64 * ratio).floor() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 / ratio;
        let idx0 = src_idx.floor() as usize;
        let idx1 = (idx0 + 1).min(frame.samples.len() - 1);
        let frac = (src_idx - idx0 as f64) as f32;

        let sample = frame.samples[idx0] * (1.0 - frac) + frame.samples[idx1] * frac;
        output.push(sample);
    }

    AudioFrame {
        samples: output,
        sample_rate: target_rate,
        channels: frame.channels,
        source: frame.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CaptureSource;

    fn frame(samples: Vec<f32>, sample_rate: u32, channels: u16) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate,
            channels,
            source: CaptureSource::Mic,
        }
    }

    #[test]
    fn target_format_passes_through_unchanged() {
        let input = frame(vec![0.1, 0.2, 0.3], 16000, 1);
        let out = process_frame(input.clone(), 16000, 1);
        assert_eq!(out.samples, input.samples);
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.channels, 1);
    }

    #[test]
    fn stereo_folds_to_mono_average() {
        let input = frame(vec![0.5, 0.1, -0.2, -0.4], 16000, 2);
        let out = process_frame(input, 16000, 1);
        assert_eq!(out.channels, 1);
        assert_eq!(out.samples.len(), 2);
        assert!((out.samples[0] - 0.3).abs() < 1e-6);
        assert!((out.samples[1] - (-0.3)).abs() < 1e-6);
    }

    #[test]
    fn integer_ratio_downsample_shrinks_by_ratio() {
        let input = frame(vec![0.0; 4800], 48000, 1);
        let out = process_frame(input, 16000, 1);
        assert_eq!(out.sample_rate, 16000);
        assert_eq!(out.samples.len(), 1600);
    }

    #[test]
    fn fractional_ratio_downsample_keeps_constant_signal() {
        let input = frame(vec![0.25; 4410], 44100, 1);
        let out = process_frame(input, 16000, 1);
        assert_eq!(out.samples.len(), 1600);
        for &s in &out.samples {
            assert!((s - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_frame_stays_empty() {
        let out = process_frame(frame(vec![], 48000, 2), 16000, 1);
        assert!(out.samples.is_empty());
        assert_eq!(out.sample_rate, 16000);
    }
}
