//! Phase vocoder pipeline
//!
//! Chains analysis, spectral shifting and resynthesis so that callers only
//! push sample blocks and read sample blocks.

use crate::error::{validate_stream, Result, SpectralError};
use crate::spectrum::{
    generate_window, scale_for_overlap_add, ShiftParams, SpectralFrame, SpectralShifter,
    StreamAnalyzer, StreamSynthesizer, WindowType,
};

/// Pipeline configuration, fixed for the lifetime of a [`PhaseVocoder`]
#[derive(Debug, Clone, PartialEq)]
pub struct VocoderConfig {
    /// Transform size, a power of two
    pub window_size: usize,

    /// Samples between frames, divides `window_size`
    pub hop_size: usize,

    pub sample_rate: f64,

    /// Samples consumed and produced per [`PhaseVocoder::process`] call
    pub block_size: usize,

    /// Shape of the analysis and synthesis windows
    pub window_type: WindowType,
}

impl Default for VocoderConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            hop_size: 256,
            sample_rate: 44100.0,
            block_size: 64,
            window_type: WindowType::Hann,
        }
    }
}

impl VocoderConfig {
    pub fn validate(&self) -> Result<()> {
        validate_stream(self.window_size, self.hop_size, self.sample_rate)?;
        if self.block_size == 0 {
            return Err(SpectralError::ZeroBlockSize);
        }
        Ok(())
    }

    /// Window used for both analysis and synthesis, scaled for unity
    /// overlap-add gain
    pub fn window(&self) -> Vec<f64> {
        scale_for_overlap_add(&generate_window(self.window_type, self.window_size), self.hop_size)
    }
}

/// Streaming pitch/frequency shifter
///
/// Input is split on hop boundaries internally, so every analysis frame
/// reaches the synthesizer at the sample where it falls due regardless of the
/// block size. With identity parameters the output is the input delayed by
/// [`latency`](PhaseVocoder::latency) samples.
pub struct PhaseVocoder {
    config: VocoderConfig,
    analyzer: StreamAnalyzer,
    shifter: SpectralShifter,
    synthesizer: StreamSynthesizer,

    /// Zero-padded input block
    input: Vec<f64>,

    output: Vec<f64>,
}

impl PhaseVocoder {
    pub fn new(config: VocoderConfig) -> Result<Self> {
        config.validate()?;
        let window = config.window();

        let analyzer = StreamAnalyzer::new(&window, config.hop_size, config.sample_rate)?;
        let shifter = SpectralShifter::new(config.window_size, config.sample_rate)?;
        let synthesizer =
            StreamSynthesizer::new(&window, config.hop_size, config.sample_rate, config.block_size)?;

        log::debug!(
            "phase vocoder: window={} hop={} block={} {:?}",
            config.window_size,
            config.hop_size,
            config.block_size,
            config.window_type
        );

        Ok(Self {
            input: vec![0.0; config.block_size],
            output: vec![0.0; config.block_size],
            config,
            analyzer,
            shifter,
            synthesizer,
        })
    }

    /// Process one block
    ///
    /// Shorter input is zero-padded to the block size; samples past the block
    /// size are ignored. Returns exactly `block_size` samples.
    pub fn process(&mut self, input: &[f64], params: &ShiftParams) -> &[f64] {
        let block = self.config.block_size;
        if input.len() > block {
            log::warn!(
                "phase vocoder: {} samples passed to a {}-sample block, excess dropped",
                input.len(),
                block
            );
        }

        let take = input.len().min(block);
        self.input[..take].copy_from_slice(&input[..take]);
        self.input[take..].fill(0.0);
        self.run(block, params);
        &self.output
    }

    /// Process a signal of any length, returning the same number of samples
    pub fn process_buffer(&mut self, input: &[f64], params: &ShiftParams) -> Vec<f64> {
        let mut result = Vec::with_capacity(input.len());
        for chunk in input.chunks(self.config.block_size) {
            self.input[..chunk.len()].copy_from_slice(chunk);
            self.run(chunk.len(), params);
            result.extend_from_slice(&self.output[..chunk.len()]);
        }
        result
    }

    fn run(&mut self, len: usize, params: &ShiftParams) {
        let mut offset = 0;
        while offset < len {
            let take = self.analyzer.samples_to_next_hop().min(len - offset);
            let segment = offset..offset + take;

            let frame = self.analyzer.analyze(&self.input[segment.clone()]);
            let shifted = self.shifter.process(frame, params);
            self.synthesizer
                .synthesize_into(shifted.bins(), &mut self.output[segment]);

            offset += take;
        }
    }

    /// Delay between input and output in samples
    pub fn latency(&self) -> usize {
        self.synthesizer.latency()
    }

    /// Adopt a new sample rate in every stage; buffered audio is kept
    pub fn reset(&mut self, sample_rate: f64) {
        if let Err(e) = crate::error::validate_sample_rate(sample_rate) {
            log::warn!("phase vocoder reset ignored: {}", e);
            return;
        }
        self.analyzer.reset(sample_rate);
        self.shifter.reset(sample_rate);
        self.synthesizer.reset(sample_rate);
        self.config.sample_rate = sample_rate;
    }

    /// Drop all buffered audio and phase memory
    pub fn flush(&mut self) {
        self.analyzer.flush();
        self.synthesizer.flush();
        self.output.fill(0.0);
    }

    pub fn config(&self) -> &VocoderConfig {
        &self.config
    }

    /// Latest analysis frame
    pub fn analysis_frame(&self) -> &SpectralFrame {
        self.analyzer.frame()
    }

    /// Latest shifted frame
    pub fn shifted_frame(&self) -> &SpectralFrame {
        self.shifter.frame()
    }

    /// Shifter stage, e.g. to change the formant envelope order
    pub fn shifter_mut(&mut self) -> &mut SpectralShifter {
        &mut self.shifter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VocoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window().len(), 1024);
    }

    #[test]
    fn test_invalid_config() {
        let config = VocoderConfig {
            block_size: 0,
            ..VocoderConfig::default()
        };
        assert_eq!(config.validate(), Err(SpectralError::ZeroBlockSize));

        let config = VocoderConfig {
            hop_size: 300,
            ..VocoderConfig::default()
        };
        assert!(PhaseVocoder::new(config).is_err());
    }

    #[test]
    fn test_block_length_and_padding() {
        let config = VocoderConfig {
            window_size: 64,
            hop_size: 16,
            block_size: 10,
            ..VocoderConfig::default()
        };
        let mut vocoder = PhaseVocoder::new(config).unwrap();
        assert_eq!(vocoder.latency(), 64);

        let params = ShiftParams::default();
        assert_eq!(vocoder.process(&[0.5; 3], &params).len(), 10);
        assert_eq!(vocoder.process(&[0.5; 25], &params).len(), 10);
        assert_eq!(vocoder.process_buffer(&[0.5; 37], &params).len(), 37);
    }

    #[test]
    fn test_identity_is_delay() {
        let config = VocoderConfig {
            window_size: 256,
            hop_size: 64,
            block_size: 48,
            ..VocoderConfig::default()
        };
        let mut vocoder = PhaseVocoder::new(config).unwrap();

        let input: Vec<f64> = (0..2000).map(|n| (n as f64 * 0.05).sin() * 0.7).collect();
        let output = vocoder.process_buffer(&input, &ShiftParams::default());

        for t in 256..output.len() {
            assert!((output[t] - input[t - 256]).abs() < 1e-9, "sample {}", t);
        }
    }

    #[test]
    fn test_flush_silences() {
        let config = VocoderConfig {
            window_size: 64,
            hop_size: 16,
            block_size: 16,
            ..VocoderConfig::default()
        };
        let mut vocoder = PhaseVocoder::new(config).unwrap();
        let params = ShiftParams::default();

        for _ in 0..10 {
            vocoder.process(&[0.3; 16], &params);
        }
        vocoder.flush();
        for _ in 0..4 {
            assert!(vocoder.process(&[0.0; 16], &params).iter().all(|&s| s == 0.0));
        }
    }
}
