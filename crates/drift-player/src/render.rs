//! Offline rendering of one venue to a WAV file

use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

use drift_core::config::EngineConfig;
use drift_core::types::StereoBuffer;
use drift_core::Engine;

/// Seconds rendered per chunk, bounding memory on long renders
const CHUNK_SECS: f64 = 10.0;

pub struct RenderJob<'a> {
    pub genre: &'a str,
    pub volume_percent: f32,
    pub seconds: f64,
    pub sample_rate: u32,
    pub engine: EngineConfig,
}

/// Render a single venue and write it as 32-bit float stereo
///
/// Returns the number of frames written.
pub fn render_to_wav(job: RenderJob<'_>, path: &Path) -> Result<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate: job.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("Failed to create {:?}", path))?;

    let mut engine = Engine::offline(job.engine, job.sample_rate);
    engine.start_venue("render", job.genre, job.volume_percent);
    if !engine.is_playing("render") {
        anyhow::bail!("Engine did not start");
    }

    let mut frames = 0u64;
    let mut remaining = job.seconds.max(0.0);
    while remaining > 0.0 {
        let chunk = remaining.min(CHUNK_SECS);
        let block = engine.run_offline(chunk)?;
        write_block(&mut writer, &block)?;
        frames += block.len() as u64;
        remaining -= chunk;
    }
    engine.dispose();

    writer.finalize().context("Failed to finalize WAV file")?;
    log::info!("Rendered {} frames to {:?}", frames, path);
    Ok(frames)
}

fn write_block<W>(writer: &mut WavWriter<W>, block: &StereoBuffer) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    for sample in block.iter() {
        writer.write_sample(sample.left)?;
        writer.write_sample(sample.right)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_writes_stereo_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("lobby.wav");
        let job = RenderJob {
            genre: "lounge",
            volume_percent: 60.0,
            seconds: 1.5,
            sample_rate: 8000,
            engine: EngineConfig::seeded(3),
        };

        let frames = render_to_wav(job, &path).unwrap();
        assert_eq!(frames, 12_000);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        assert_eq!(reader.len(), 24_000);
    }
}
