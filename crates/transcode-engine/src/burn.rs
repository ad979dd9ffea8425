//! Per-file burn lifecycle.
//!
//! For every input file: link the source next to the output under a plain
//! name, settle the bitrate, build both passes, run them, and clean up the
//! link and pass logs however the passes ended.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use burner_common::{BurnerConfig, BurnerError, BurnerResult, VideoDefaults};
use burner_media_model::{format_bitrate, parse_bitrate, BitrateAdvice, FilterSpec, Profile};
use walkdir::WalkDir;

use crate::classify::ClassifierChain;
use crate::command::{Invocation, ProfileCommand, PASS_LOG_ARTIFACTS};
use crate::probe::{DurationProbe, FfprobeDuration};
use crate::supervise::{Console, Supervisor};
use crate::tools::Toolchain;

/// Extensions picked up from the input directory.
pub const SUPPORTED_INPUT_EXTENSIONS: [&str; 3] = ["mkv", "mp4", "avs"];

/// Scale width that follows the aspect ratio and stays divisible by two,
/// as required for 4:2:0 chroma subsampling.
const AUTO_EVEN_WIDTH: i32 = -2;

/// Everything the orchestrator needs to know about one run.
#[derive(Debug, Clone)]
pub struct BurnSettings {
    pub profile: Profile,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub video: VideoDefaults,
    pub tolerate_font_errors: bool,
    /// Zero disables `-progress` output and the reducer.
    pub progress_stride: usize,
    pub verbose: bool,
}

impl BurnSettings {
    pub fn from_config(profile: Profile, config: &BurnerConfig) -> Self {
        Self {
            profile,
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            video: config.video.clone(),
            tolerate_font_errors: config.tolerate_font_errors,
            progress_stride: config.progress_stride,
            verbose: false,
        }
    }
}

/// Bitrate decision and commands for one input file.
#[derive(Debug, Clone)]
pub struct BurnPlan {
    pub bitrate: String,
    pub advice: Option<BitrateAdvice>,
    pub command: ProfileCommand,
    pub first_pass: Invocation,
    pub second_pass: Invocation,
}

/// Totals of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<PathBuf>,
}

/// Hard link to the source with a name that needs no filter escaping.
/// Removed on drop.
#[derive(Debug)]
pub struct TempLink {
    path: PathBuf,
}

impl TempLink {
    pub fn create(source: &Path, dir: &Path) -> BurnerResult<Self> {
        let name = match source.extension() {
            Some(ext) => format!("tmp.{}", ext.to_string_lossy()),
            None => "tmp".to_string(),
        };
        let path = dir.join(name);
        remove_if_present(&path)
            .map_err(|e| BurnerError::link(format!("{}: {e}", path.display())))?;
        fs::hard_link(source, &path).map_err(|e| {
            BurnerError::link(format!(
                "{} -> {}: {e}",
                source.display(),
                path.display()
            ))
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempLink {
    fn drop(&mut self) {
        if let Err(e) = remove_if_present(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temporary link");
        }
    }
}

/// Removes two-pass log artifacts from a directory on drop.
#[derive(Debug)]
pub struct PassLogCleanup {
    dir: PathBuf,
}

impl PassLogCleanup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Drop for PassLogCleanup {
    fn drop(&mut self) {
        for artifact in PASS_LOG_ARTIFACTS {
            let path = self.dir.join(artifact);
            if let Err(e) = remove_if_present(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove pass log");
            }
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Every file below `dir` with a supported extension, in path order.
pub fn list_input_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SUPPORTED_INPUT_EXTENSIONS.contains(&ext))
        })
        .collect();
    files.sort();
    files
}

/// Drives the two-pass encodes for every input file.
pub struct Burner<W> {
    settings: BurnSettings,
    ffmpeg: PathBuf,
    probe: Option<Box<dyn DurationProbe>>,
    supervisor: Supervisor<W>,
}

impl<W: Write + Send + 'static> Burner<W> {
    /// Orchestrator using the discovered tools.
    pub fn new(settings: BurnSettings, tools: &Toolchain, console: Console<W>) -> BurnerResult<Self> {
        let probe = tools
            .ffprobe
            .as_ref()
            .map(|path| Box::new(FfprobeDuration::new(path)) as Box<dyn DurationProbe>);
        Self::with_probe(settings, tools.ffmpeg.clone(), probe, console)
    }

    /// Orchestrator with an explicit duration probe.
    ///
    /// Fails with a setup error when the input or output directory is
    /// missing. Both are made absolute because the passes run inside the
    /// output directory.
    pub fn with_probe(
        mut settings: BurnSettings,
        ffmpeg: PathBuf,
        probe: Option<Box<dyn DurationProbe>>,
        console: Console<W>,
    ) -> BurnerResult<Self> {
        settings.input_dir = fs::canonicalize(&settings.input_dir).map_err(|e| {
            BurnerError::setup(format!(
                "missing input directory {}: {e}",
                settings.input_dir.display()
            ))
        })?;
        settings.output_dir = fs::canonicalize(&settings.output_dir).map_err(|e| {
            BurnerError::setup(format!(
                "missing output directory {}: {e}",
                settings.output_dir.display()
            ))
        })?;

        let chain = ClassifierChain::standard(settings.tolerate_font_errors, settings.verbose);
        let stride = (settings.progress_stride > 0).then_some(settings.progress_stride);
        let supervisor = Supervisor::new(console, chain, stride);

        Ok(Self {
            settings,
            ffmpeg,
            probe,
            supervisor,
        })
    }

    pub fn settings(&self) -> &BurnSettings {
        &self.settings
    }

    /// Pick the bitrate for `input`.
    ///
    /// Skipped when the configured bitrate is kept or no probe is
    /// available. A probe failure fails the file.
    fn settle_bitrate(&self, input: &Path) -> BurnerResult<(String, Option<BitrateAdvice>)> {
        let requested = self.settings.video.bitrate.clone();
        let probe = match &self.probe {
            Some(probe) if !self.settings.video.keep_bitrate => probe,
            _ => return Ok((requested, None)),
        };

        let duration = probe.duration(input)?;
        let source_bytes = fs::metadata(input)?.len();
        let advice = BitrateAdvice::evaluate(duration, parse_bitrate(&requested), source_bytes);

        let bitrate = match advice {
            BitrateAdvice::Keep => requested,
            BitrateAdvice::Reduce(kilobit) => {
                let reduced = format_bitrate(kilobit);
                tracing::info!(from = %requested, to = %reduced, "bitrate was modified to {reduced}");
                reduced
            }
            BitrateAdvice::Unusable(kilobit) => {
                tracing::warn!(
                    advised = kilobit,
                    bitrate = %requested,
                    "Source implies no room for video, keeping requested bitrate"
                );
                requested
            }
        };
        Ok((bitrate, Some(advice)))
    }

    /// Decide the bitrate and build both passes for `input`, with the
    /// subtitle read from `subtitle_source`.
    pub fn plan(&self, input: &Path, subtitle_source: &Path) -> BurnerResult<BurnPlan> {
        let (bitrate, advice) = self.settle_bitrate(input)?;

        let filter = FilterSpec {
            subtitle: Some(subtitle_source.to_string_lossy().into_owned()),
            width: AUTO_EVEN_WIDTH,
            height: self.settings.video.height,
            upscaling: self.settings.video.upscaling,
        };
        let command = ProfileCommand::new(
            self.settings.profile,
            &self.ffmpeg,
            input,
            &self.settings.output_dir,
            &bitrate,
            filter,
        );

        let mut first_pass = command.first_pass();
        let mut second_pass = command.second_pass();
        let prefix = self.pass_prefix();
        first_pass.prepend_args(prefix.iter().copied());
        second_pass.prepend_args(prefix.iter().copied());

        Ok(BurnPlan {
            bitrate,
            advice,
            command,
            first_pass,
            second_pass,
        })
    }

    fn pass_prefix(&self) -> Vec<&'static str> {
        let mut prefix = Vec::new();
        if !self.settings.verbose {
            prefix.push("-hide_banner");
        }
        if self.settings.progress_stride > 0 {
            prefix.extend(["-nostats", "-progress", "pipe:1"]);
        }
        prefix
    }

    /// Burn a single file.
    pub fn burn_file(&self, input: &Path) -> BurnerResult<()> {
        let link = TempLink::create(input, &self.settings.output_dir)?;
        let plan = self.plan(input, link.path())?;

        let out_dir = plan.command.out_dir();
        fs::create_dir_all(out_dir)?;
        let _cleanup = PassLogCleanup::new(out_dir);

        for pass in [&plan.first_pass, &plan.second_pass] {
            if self.settings.verbose {
                let console = self.supervisor.console();
                let mut console = console.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                console.write_chunk(&pass.to_string())?;
            }
            self.supervisor.run(pass)?.into_result()?;
        }

        tracing::debug!(output = %out_dir.join(plan.command.out_file()).display(), "Burn complete");
        Ok(())
    }

    /// Burn every input file. A failed file is logged and skipped; only
    /// setup errors end the run early.
    pub fn run(&self) -> BurnerResult<RunSummary> {
        let files = list_input_files(&self.settings.input_dir);
        if files.is_empty() {
            tracing::warn!(dir = %self.settings.input_dir.display(), "No input files found");
        }

        let mut summary = RunSummary {
            total: files.len(),
            ..Default::default()
        };
        for (i, file) in files.iter().enumerate() {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::info!("[{:03}/{:03}] {}", i + 1, summary.total, name);

            match self.burn_file(file) {
                Ok(()) => summary.succeeded += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "Failed to burn file");
                    summary.failed.push(file.clone());
                }
            }
        }
        Ok(summary)
    }
}
