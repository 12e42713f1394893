//! Speaks tutor replies through the default output device.

use crate::audio::{AudioError, SPEECH_PCM_SAMPLE_RATE, decode_pcm16_le, resample};
use async_trait::async_trait;
use cpal::{
    FromSample, Sample, SampleFormat, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use mathtutor_core::speech::{ElevenLabsClient, OutputFormat, SpeechError, SpeechSynthesizer};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};
use tracing::{debug, error};

/// Synthesizes speech with ElevenLabs and plays it locally.
pub struct LocalSpeaker {
    client: ElevenLabsClient,
}

impl LocalSpeaker {
    pub fn new(client: ElevenLabsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechSynthesizer for LocalSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let pcm = self.client.synthesize(text, OutputFormat::Pcm24k).await?;
        let samples = decode_pcm16_le(&pcm);
        debug!(samples = samples.len(), "Speech synthesized");

        // cpal streams are not Send; keep the whole playback on a blocking thread.
        tokio::task::spawn_blocking(move || play_blocking(samples))
            .await
            .map_err(|e| SpeechError::Playback(e.to_string()))?
            .map_err(|e| SpeechError::Playback(e.to_string()))
    }
}

/// Plays 24kHz mono samples on the default output device and waits for them to finish.
pub fn play_blocking(samples: Vec<f32>) -> Result<(), AudioError> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::Config(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let samples = resample(&samples, SPEECH_PCM_SAMPLE_RATE, config.sample_rate.0)?;
    debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = config.sample_rate.0,
        channels = config.channels,
        "Starting playback"
    );

    match sample_format {
        SampleFormat::F32 => play_on::<f32>(&device, &config, samples),
        SampleFormat::I16 => play_on::<i16>(&device, &config, samples),
        SampleFormat::U16 => play_on::<u16>(&device, &config, samples),
        other => Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
    }
}

fn play_on<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Vec<f32>,
) -> Result<(), AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let frame_count = samples.len();

    let (mut producer, mut consumer) = HeapRb::<f32>::new(frame_count.max(1)).split();
    producer.push_slice(&samples);

    let finished = Arc::new(AtomicBool::new(false));
    let finished_in_callback = finished.clone();

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = consumer.try_pop().unwrap_or_else(|| {
                        finished_in_callback.store(true, Ordering::Relaxed);
                        0.0
                    });
                    for out in frame.iter_mut() {
                        *out = T::from_sample(sample);
                    }
                }
            },
            |err| error!(error = %err, "Audio playback error"),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))?;
    stream
        .play()
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    let clip = Duration::from_millis(frame_count as u64 * 1000 / config.sample_rate.0 as u64);
    let deadline = Instant::now() + clip + Duration::from_millis(500);
    while !finished.load(Ordering::Relaxed) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    debug!(frames = frame_count, "Playback complete");
    Ok(())
}
