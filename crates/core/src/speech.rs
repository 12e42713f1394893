//! Text-to-speech.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
/// "Rachel", a clear and neutral stock voice.
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_VOICE_MODEL: &str = "eleven_monolingual_v1";

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Request(String),
    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("audio playback failed: {0}")]
    Playback(String),
}

/// Speaks text to the student. Audio I/O is the implementor's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Voice tuning sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    /// Slightly raised stability for a calm, clear teaching voice.
    fn default() -> Self {
        Self {
            stability: 0.71,
            similarity_boost: 0.5,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// MP3 at 44.1kHz, 128kbps; what browsers play directly.
    #[default]
    Mp3,
    /// Raw little-endian 16-bit mono PCM at 24kHz.
    Pcm24k,
}

impl OutputFormat {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3_44100_128",
            Self::Pcm24k => "pcm_24000",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Pcm24k => "audio/pcm",
        }
    }
}

/// ElevenLabs text-to-speech client.
#[derive(Clone)]
pub struct ElevenLabsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    settings: VoiceSettings,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

impl ElevenLabsClient {
    /// Creates a client; a missing voice id falls back to [`DEFAULT_VOICE_ID`].
    pub fn new(api_key: String, voice_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            api_key,
            voice_id: voice_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            model_id: DEFAULT_VOICE_MODEL.to_string(),
            settings: VoiceSettings::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    fn synthesis_url(&self, format: OutputFormat) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.base_url.trim_end_matches('/'),
            self.voice_id,
            format.as_query_value()
        )
    }

    /// Renders `text` to audio in the requested format.
    pub async fn synthesize(&self, text: &str, format: OutputFormat) -> Result<Bytes, SpeechError> {
        let request = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: self.settings,
        };

        let response = self
            .client
            .post(self.synthesis_url(format))
            .header("xi-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SpeechError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status { status, body });
        }

        response
            .bytes()
            .await
            .map_err(|e| SpeechError::Request(e.to_string()))
    }
}
