//! Encode every file in the input directory.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use burner_common::{BurnerConfig, BurnerError, BurnerResult};
use burner_media_model::{Profile, MENU};
use burner_transcode_engine::{console, BurnSettings, Burner, Toolchain};
use clap::Args;

#[derive(Debug, Args)]
pub struct BurnArgs {
    /// Output profile: smp4, fmp4, mp4 or transcode. Prompted when absent
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Directory of the input files
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory of the output files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep encoding when a subtitle font or glyph is missing
    #[arg(long)]
    pub ignore_font_error: bool,

    /// Target video height
    #[arg(long)]
    pub v_height: Option<i32>,

    /// Target video bitrate, e.g. 1371k or 2M
    #[arg(long)]
    pub v_bitrate: Option<String>,

    /// Never lower the bitrate to match the source
    #[arg(long)]
    pub v_keep_bitrate: bool,

    /// Allow scaling above the source resolution
    #[arg(long)]
    pub v_upscaling: bool,

    /// Progress updates per summary line; 0 leaves ffmpeg's own stats line
    #[arg(long)]
    pub progress_stride: Option<usize>,

    /// Write the config, with these flags applied, back to the config file
    #[arg(long)]
    pub save_config: bool,
}

impl BurnArgs {
    fn apply(&self, config: &mut BurnerConfig) {
        if let Some(input) = &self.input {
            config.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(height) = self.v_height {
            config.video.height = height;
        }
        if let Some(bitrate) = &self.v_bitrate {
            config.video.bitrate = bitrate.clone();
        }
        if let Some(stride) = self.progress_stride {
            config.progress_stride = stride;
        }
        config.video.keep_bitrate |= self.v_keep_bitrate;
        config.video.upscaling |= self.v_upscaling;
        config.tolerate_font_errors |= self.ignore_font_error;
    }
}

pub fn run(
    args: BurnArgs,
    mut config: BurnerConfig,
    config_path: &Path,
    verbose: bool,
) -> anyhow::Result<()> {
    args.apply(&mut config);
    if args.save_config {
        save_config(&config, config_path)?;
    }

    let tools = Toolchain::discover()?;
    if verbose {
        tracing::debug!(ffmpeg = %tools.ffmpeg.display(), "Using ffmpeg");
    }

    let profile = match args.mode.as_deref().map(str::parse::<Profile>) {
        Some(Ok(profile)) => profile,
        Some(Err(e)) => {
            tracing::warn!("{e}");
            prompt_profile(&mut io::stdin().lock(), &mut io::stdout())?
        }
        None => prompt_profile(&mut io::stdin().lock(), &mut io::stdout())?,
    };
    tracing::info!(mode = %profile, "{}", profile.label());

    let mut settings = BurnSettings::from_config(profile, &config);
    settings.verbose = verbose;

    let burner = Burner::new(settings, &tools, console(io::stdout()))?;
    let summary = burner.run()?;

    if summary.failed.is_empty() {
        tracing::info!(files = summary.succeeded, "All files burned");
    } else {
        tracing::warn!(
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "Some files failed"
        );
    }
    Ok(())
}

fn save_config(config: &BurnerConfig, path: &Path) -> BurnerResult<()> {
    config.save_to(path)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Show the profile menu until a valid index is typed.
///
/// End of input aborts instead of asking again.
pub fn prompt_profile(input: &mut impl BufRead, out: &mut impl Write) -> BurnerResult<Profile> {
    let mut line = String::new();
    loop {
        writeln!(out, "Select mode:")?;
        for profile in MENU {
            writeln!(out, "[{}] {}", profile.menu_index(), profile.label())?;
        }
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Err(BurnerError::setup("no mode selected"));
        }
        if let Some(profile) = Profile::from_menu_input(&line) {
            return Ok(profile);
        }
    }
}
