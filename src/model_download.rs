use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

/// Directory checked for models shipped next to the binary before downloading.
const BUNDLED_MODEL_DIR: &str = "assets/models";
const READ_CHUNK: usize = 16 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    PalmDetector,
    HandLandmarks,
}

impl ModelKind {
    /// Load order: the palm detector is small and gates the landmark model.
    pub const ALL: [ModelKind; 2] = [ModelKind::PalmDetector, ModelKind::HandLandmarks];

    pub fn filename(self) -> &'static str {
        match self {
            ModelKind::PalmDetector => "palm_detection_mediapipe_2023feb.onnx",
            ModelKind::HandLandmarks => "handpose_estimation_mediapipe_2023feb.onnx",
        }
    }

    fn url(self) -> &'static str {
        match self {
            ModelKind::PalmDetector => {
                "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/palm_detection_mediapipe_2023feb.onnx"
            }
            ModelKind::HandLandmarks => {
                "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/handpose_estimation_mediapipe_2023feb.onnx"
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModelKind::PalmDetector => "palm detector",
            ModelKind::HandLandmarks => "hand landmark",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelDownloadEvent {
    AlreadyPresent {
        model: ModelKind,
    },
    Started {
        model: ModelKind,
        total: Option<u64>,
    },
    Progress {
        model: ModelKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        model: ModelKind,
    },
}

impl ModelDownloadEvent {
    pub fn model(&self) -> ModelKind {
        match self {
            ModelDownloadEvent::AlreadyPresent { model }
            | ModelDownloadEvent::Started { model, .. }
            | ModelDownloadEvent::Progress { model, .. }
            | ModelDownloadEvent::Finished { model } => *model,
        }
    }
}

pub fn model_path(kind: ModelKind, model_dir: &Path) -> PathBuf {
    model_dir.join(kind.filename())
}

/// Makes sure `kind` exists under `model_dir`, copying a bundled file or downloading it.
/// Returns the path of the ready model.
pub fn ensure_model_ready<F>(
    kind: ModelKind,
    model_dir: &Path,
    mut on_event: F,
) -> anyhow::Result<PathBuf>
where
    F: FnMut(ModelDownloadEvent),
{
    let dest = model_path(kind, model_dir);
    if dest.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model: kind });
        on_event(ModelDownloadEvent::Finished { model: kind });
        return Ok(dest);
    }

    fs::create_dir_all(model_dir)
        .with_context(|| format!("failed to create model directory {}", model_dir.display()))?;

    let bundled = Path::new(BUNDLED_MODEL_DIR).join(kind.filename());
    if bundled.exists() {
        on_event(ModelDownloadEvent::Started {
            model: kind,
            total: None,
        });
        fs::copy(&bundled, &dest).with_context(|| {
            format!(
                "failed to copy bundled {} model from {} to {}",
                kind.label(),
                bundled.display(),
                dest.display()
            )
        })?;
        on_event(ModelDownloadEvent::Finished { model: kind });
        return Ok(dest);
    }

    let mut progress: Option<ProgressBar> = None;
    download_to_path(kind, &dest, &mut |event| {
        match &event {
            ModelDownloadEvent::Started { total, .. } => {
                progress = Some(create_progress_bar(*total));
            }
            ModelDownloadEvent::Progress { downloaded, .. } => {
                if let Some(pb) = progress.as_ref() {
                    pb.set_position(*downloaded);
                }
            }
            ModelDownloadEvent::Finished { model } => {
                if let Some(pb) = progress.take() {
                    pb.finish_with_message(format!("{} model ready", model.label()));
                }
            }
            ModelDownloadEvent::AlreadyPresent { .. } => {}
        }
        on_event(event);
    })
    .with_context(|| format!("failed to download {} model to {}", kind.label(), dest.display()))?;

    Ok(dest)
}

fn download_to_path<F>(model: ModelKind, dest: &Path, on_event: &mut F) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    let url = model.url();
    log::info!(
        "downloading {} model from {url} to {}",
        model.label(),
        dest.display()
    );

    let mut response = Client::new()
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total = response.content_length();
    on_event(ModelDownloadEvent::Started { model, total });

    let tmp_path = dest.with_extension("download");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let read = response
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .context("failed while writing model to disk")?;
        downloaded += read as u64;
        on_event(ModelDownloadEvent::Progress {
            model,
            downloaded,
            total,
        });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")?;
    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(ModelDownloadEvent::Finished { model });
    Ok(())
}

fn create_progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} downloading model")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            pb.set_style(style);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gesture-tree-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn present_models_are_not_fetched_again() {
        let dir = scratch_dir("present");
        fs::create_dir_all(&dir).expect("create scratch dir");
        let path = model_path(ModelKind::HandLandmarks, &dir);
        fs::write(&path, b"onnx").expect("write fake model");

        let mut events = Vec::new();
        let ready = ensure_model_ready(ModelKind::HandLandmarks, &dir, |event| events.push(event))
            .expect("present model is ready");

        assert_eq!(ready, path);
        assert_eq!(
            events,
            vec![
                ModelDownloadEvent::AlreadyPresent {
                    model: ModelKind::HandLandmarks
                },
                ModelDownloadEvent::Finished {
                    model: ModelKind::HandLandmarks
                },
            ]
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn kinds_have_distinct_files() {
        assert_ne!(
            ModelKind::PalmDetector.filename(),
            ModelKind::HandLandmarks.filename()
        );
        for kind in ModelKind::ALL {
            assert!(kind.filename().ends_with(".onnx"));
            assert!(kind.url().ends_with(kind.filename()));
        }
        let event = ModelDownloadEvent::Progress {
            model: ModelKind::PalmDetector,
            downloaded: 10,
            total: None,
        };
        assert_eq!(event.model(), ModelKind::PalmDetector);
    }
}
