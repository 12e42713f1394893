//! PCM conversion and resampling for speech playback.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Rate of the raw PCM that ElevenLabs returns for `pcm_24000`.
pub const SPEECH_PCM_SAMPLE_RATE: u32 = 24_000;

const RESAMPLER_CHUNK_SIZE: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no output device available")]
    NoOutputDevice,
    #[error("output device configuration failed: {0}")]
    Config(String),
    #[error("unsupported output sample format: {0}")]
    UnsupportedFormat(String),
    #[error("audio stream failed: {0}")]
    Stream(String),
    #[error("resampling failed: {0}")]
    Resample(String),
}

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> Result<FastFixedIn<f32>, AudioError> {
    FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1, // mono
    )
    .map_err(|e| AudioError::Resample(e.to_string()))
}

/// Interprets little-endian 16-bit PCM bytes as normalized f32 samples.
/// A trailing odd byte is ignored.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<f32> {
    let pcm16: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    convert_i16_to_f32(&pcm16)
}

/// Converts a slice of i16 samples to a vector of f32 samples.
pub fn convert_i16_to_f32(pcm16: &[i16]) -> Vec<f32> {
    pcm16
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

/// Resamples mono audio from `in_rate` to `out_rate`.
pub fn resample(samples: &[f32], in_rate: u32, out_rate: u32) -> Result<Vec<f32>, AudioError> {
    if in_rate == out_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        create_resampler(in_rate as f64, out_rate as f64, RESAMPLER_CHUNK_SIZE)?;
    let mut output =
        Vec::with_capacity(samples.len() * out_rate as usize / in_rate as usize + 1);

    let mut chunks = samples.chunks_exact(RESAMPLER_CHUNK_SIZE);
    for chunk in chunks.by_ref() {
        let frames = resampler
            .process(&[chunk], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let input: [&[f32]; 1] = [remainder];
        let frames = resampler
            .process_partial(Some(&input[..]), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    Ok(output)
}
