//! Encoding captured frames as a looping GIF

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// `<dir>/deformation_<YYYYmmdd_HHMMSS>.gif`
pub fn animation_path<Tz>(dir: &Path, time: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    dir.join(format!("deformation_{}.gif", time.format("%Y%m%d_%H%M%S")))
}

/// Write `frames` as an infinitely looping GIF, creating parent directories
pub fn write_gif(frames: &[RgbaImage], path: &Path, frame_delay_ms: u32) -> Result<()> {
    if frames.is_empty() {
        anyhow::bail!("no frames to write to {}", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating animation directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;

    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;
    let delay = Delay::from_numer_denom_ms(frame_delay_ms, 1);
    encoder
        .encode_frames(frames.iter().map(|f| Frame::from_parts(f.clone(), 0, 0, delay)))
        .with_context(|| format!("encoding {}", path.display()))?;
    Ok(())
}
