// src/services/health.rs
use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::models::HealthSample;

/// Reads the newest `*.json` sample in the health directory, or generates a
/// random one when the directory holds none.
#[derive(Debug, Clone)]
pub struct HealthSource {
    dir: PathBuf,
}

impl HealthSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sample(&self, user_id: &str) -> Result<HealthSample> {
        match newest_json(&self.dir)? {
            Some(path) => {
                info!("Serving health data for {} from {}", user_id, path.display());
                let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("parsing {}", path.display()))
            }
            None => {
                debug!("No synced health data, generating a sample for {}", user_id);
                Ok(random_sample())
            }
        }
    }
}

fn newest_json(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        // equal mtimes: the later file name wins
        let newer = match &newest {
            Some((best, best_path)) => modified > *best || (modified == *best && path > *best_path),
            None => true,
        };
        if newer {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

pub fn random_sample() -> HealthSample {
    let mut rng = rand::thread_rng();
    let sleep: f64 = rng.gen_range(5.0..=9.0);
    HealthSample {
        steps: rng.gen_range(3000..=10000),
        sleep_hours: (sleep * 10.0).round() / 10.0,
        heart_rate: rng.gen_range(60..=80),
        last_sync: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn random_samples_stay_in_range() {
        for _ in 0..200 {
            let s = random_sample();
            assert!((3000..=10000).contains(&s.steps));
            assert!((5.0..=9.0).contains(&s.sleep_hours));
            assert_eq!(format!("{:.1}", s.sleep_hours).parse::<f64>().unwrap(), s.sleep_hours);
            assert!((60..=80).contains(&s.heart_rate));
            assert_eq!(s.last_sync.len(), 19);
        }
    }

    #[test]
    fn missing_directory_generates_a_sample() {
        let dir = tempfile::tempdir().unwrap();
        let source = HealthSource::new(dir.path().join("absent"));
        assert!(source.sample("default_user").is_ok());
    }

    #[test]
    fn newest_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let older = r#"{"steps":1000,"sleep_hours":6.0,"heart_rate":70,"last_sync":"2025-04-20 06:30:00"}"#;
        let newer = r#"{"steps":4235,"sleep_hours":7.5,"heart_rate":65,"last_sync":"2025-04-21 06:30:00"}"#;
        fs::write(dir.path().join("sync_20250420.json"), older).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        fs::write(dir.path().join("sync_20250421.json"), newer).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let sample = HealthSource::new(dir.path()).sample("default_user").unwrap();
        assert_eq!(sample.steps, 4235);
        assert_eq!(sample.last_sync, "2025-04-21 06:30:00");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sync.json"), "{not json").unwrap();
        assert!(HealthSource::new(dir.path()).sample("default_user").is_err());
    }
}
