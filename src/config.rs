use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory recordings are written into
    pub recordings_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interval of the elapsed-time and waveform tickers, in milliseconds
    pub tick_interval_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_shipped_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/voicenote");
        let cfg = Config::load(path).unwrap();
        assert_eq!(cfg.audio.sample_rate, 16000);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.audio.tick_interval_ms, 100);
        assert!(!cfg.storage.recordings_dir.is_empty());
    }
}
