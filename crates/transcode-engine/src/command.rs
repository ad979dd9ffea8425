//! Two-pass command construction per output profile.
//!
//! Options are accumulated in a fixed, profile specific order. The order
//! matters: ffmpeg lets a later occurrence of a flag override an earlier one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use burner_media_model::{FilterSpec, Profile};

/// Name of the output playlist for the HLS profile.
pub const HLS_PLAYLIST: &str = "out.m3u8";

/// Pass-log artifacts left in the working directory by a two-pass encode.
pub const PASS_LOG_ARTIFACTS: [&str; 2] = ["ffmpeg2pass-0.log", "ffmpeg2pass-0.log.mbtree"];

/// Output target that discards the first pass result.
#[cfg(windows)]
pub const DISCARD_TARGET: &str = "NUL";
#[cfg(not(windows))]
pub const DISCARD_TARGET: &str = "/dev/null";

/// A single ffmpeg option with the passes it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOption {
    pub flag: String,
    pub value: Option<String>,
    pub first_pass: bool,
    pub second_pass: bool,
}

impl EncodeOption {
    fn push_into(&self, args: &mut Vec<String>) {
        args.push(self.flag.clone());
        if let Some(value) = &self.value {
            args.push(value.clone());
        }
    }
}

/// Which passes an option is emitted for.
#[derive(Debug, Clone, Copy)]
enum Passes {
    Both,
    SecondOnly,
}

/// A program, its arguments, and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Insert arguments in front of the existing ones.
    pub fn prepend_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixed: Vec<String> = args.into_iter().map(Into::into).collect();
        prefixed.append(&mut self.args);
        self.args = prefixed;
    }

    /// Value following the first occurrence of `flag`.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Option set and output layout for one input file.
#[derive(Debug, Clone)]
pub struct ProfileCommand {
    executable: PathBuf,
    input: PathBuf,
    out_file: String,
    out_dir: PathBuf,
    options: Vec<EncodeOption>,
}

impl ProfileCommand {
    /// Build the command for `profile` with its preset options.
    ///
    /// `filter.subtitle` is dropped for profiles that keep subtitles soft.
    pub fn new(
        profile: Profile,
        executable: impl Into<PathBuf>,
        input: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
        bitrate: &str,
        mut filter: FilterSpec,
    ) -> Self {
        let input = input.into();
        let out_dir = out_dir.into();
        let stem = file_stem(&input);

        let (out_file, out_dir) = match profile {
            Profile::Sample => (format!("{stem}_sample.mp4"), out_dir),
            Profile::FragmentedHls => (HLS_PLAYLIST.to_string(), out_dir.join(&stem)),
            Profile::Mux => (format!("{stem}.mp4"), out_dir),
            Profile::Transcode => (
                input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("{stem}.mkv")),
                out_dir,
            ),
        };

        let mut cmd = Self {
            executable: executable.into(),
            input,
            out_file,
            out_dir,
            options: Vec::new(),
        };

        if !profile.burns_subtitles() {
            filter.subtitle = None;
        }

        if profile != Profile::Transcode {
            cmd.video_codec("libx264");
        }
        cmd.video_bitrate(bitrate)
            .tune("animation")
            .preset("medium")
            .pixel_format("yuv420p")
            .filter(&filter)
            .audio_codec("aac")
            .audio_bitrate("128k");

        match profile {
            Profile::Transcode => {
                cmd.subtitle_codec("copy")
                    .map("0:a")
                    .map("0:s")
                    .map("0:t")
                    .attachment_copy();
            }
            Profile::FragmentedHls => {
                cmd.audio_channels("2")
                    .skip_subtitle_stream()
                    .hls_flags("append_list")
                    .hls_time(Duration::from_secs(10))
                    .hls_list_size(0)
                    .hls_segment_type("fmp4");
            }
            Profile::Mux => {
                cmd.audio_channels("2").skip_subtitle_stream();
            }
            Profile::Sample => {
                cmd.audio_channels("2")
                    .skip_subtitle_stream()
                    .seek(Duration::from_secs(60))
                    .duration(Duration::from_secs(60));
            }
        }

        cmd
    }

    fn push(&mut self, passes: Passes, flag: &str, value: Option<String>) -> &mut Self {
        self.options.push(EncodeOption {
            flag: flag.to_string(),
            value,
            first_pass: matches!(passes, Passes::Both),
            second_pass: true,
        });
        self
    }

    /// Codec for all video streams.
    pub fn video_codec(&mut self, codec: &str) -> &mut Self {
        self.push(Passes::Both, "-c:v", Some(codec.to_string()))
    }

    /// Bitrate for all video streams.
    pub fn video_bitrate(&mut self, bitrate: &str) -> &mut Self {
        self.push(Passes::Both, "-b:v", Some(bitrate.to_string()))
    }

    pub fn tune(&mut self, tune: &str) -> &mut Self {
        self.push(Passes::Both, "-tune", Some(tune.to_string()))
    }

    pub fn preset(&mut self, preset: &str) -> &mut Self {
        self.push(Passes::Both, "-preset", Some(preset.to_string()))
    }

    pub fn pixel_format(&mut self, format: &str) -> &mut Self {
        self.push(Passes::Both, "-pix_fmt", Some(format.to_string()))
    }

    pub fn filter(&mut self, filter: &FilterSpec) -> &mut Self {
        self.push(Passes::Both, "-filter_complex", Some(filter.render()))
    }

    pub fn audio_codec(&mut self, codec: &str) -> &mut Self {
        self.push(Passes::SecondOnly, "-c:a", Some(codec.to_string()))
    }

    pub fn audio_bitrate(&mut self, bitrate: &str) -> &mut Self {
        self.push(Passes::SecondOnly, "-b:a", Some(bitrate.to_string()))
    }

    /// Downmix the output to `channels` channels.
    pub fn audio_channels(&mut self, channels: &str) -> &mut Self {
        self.push(Passes::SecondOnly, "-ac", Some(channels.to_string()))
    }

    pub fn subtitle_codec(&mut self, codec: &str) -> &mut Self {
        self.push(Passes::SecondOnly, "-c:s", Some(codec.to_string()))
    }

    pub fn skip_subtitle_stream(&mut self) -> &mut Self {
        self.push(Passes::SecondOnly, "-sn", None)
    }

    pub fn map(&mut self, selector: &str) -> &mut Self {
        self.push(Passes::SecondOnly, "-map", Some(selector.to_string()))
    }

    /// Copy attachment streams (fonts) unchanged.
    pub fn attachment_copy(&mut self) -> &mut Self {
        self.push(Passes::SecondOnly, "-c:t", Some("copy".to_string()))
    }

    pub fn hls_flags(&mut self, flags: &str) -> &mut Self {
        self.push(Passes::SecondOnly, "-hls_flags", Some(flags.to_string()))
    }

    /// Target segment length; segments are cut on the next key frame after it.
    pub fn hls_time(&mut self, segment: Duration) -> &mut Self {
        self.push(
            Passes::SecondOnly,
            "-hls_time",
            Some(segment.as_secs().to_string()),
        )
    }

    /// Maximum playlist entries, `0` keeps every segment.
    pub fn hls_list_size(&mut self, size: u32) -> &mut Self {
        self.push(Passes::SecondOnly, "-hls_list_size", Some(size.to_string()))
    }

    pub fn hls_segment_type(&mut self, segment_type: &str) -> &mut Self {
        self.push(
            Passes::SecondOnly,
            "-hls_segment_type",
            Some(segment_type.to_string()),
        )
    }

    /// Decode but discard input until `position`.
    pub fn seek(&mut self, position: Duration) -> &mut Self {
        self.push(Passes::Both, "-ss", Some(clock_time(position)))
    }

    /// Stop writing output after `length`.
    pub fn duration(&mut self, length: Duration) -> &mut Self {
        self.push(Passes::Both, "-t", Some(clock_time(length)))
    }

    /// Directory the passes run in and the output is written to.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Output file name, relative to [`ProfileCommand::out_dir`].
    pub fn out_file(&self) -> &str {
        &self.out_file
    }

    pub fn options(&self) -> &[EncodeOption] {
        &self.options
    }

    /// Analysis pass: no audio, output discarded.
    pub fn first_pass(&self) -> Invocation {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().into_owned(),
            "-pass".to_string(),
            "1".to_string(),
        ];
        for option in self.options.iter().filter(|o| o.first_pass) {
            option.push_into(&mut args);
        }
        args.extend(
            ["-an", "-f", "mp4", DISCARD_TARGET]
                .into_iter()
                .map(str::to_string),
        );
        self.invocation(args)
    }

    /// Encoding pass writing the real output.
    pub fn second_pass(&self) -> Invocation {
        let mut args = vec![
            "-i".to_string(),
            self.input.to_string_lossy().into_owned(),
            "-pass".to_string(),
            "2".to_string(),
        ];
        for option in self.options.iter().filter(|o| o.second_pass) {
            option.push_into(&mut args);
        }
        args.push(self.out_file.clone());
        self.invocation(args)
    }

    fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation {
            program: self.executable.clone(),
            args,
            working_dir: self.out_dir.clone(),
        }
    }
}

/// File name without directory or extension.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `HH:MM:SS` rendering of a duration, as accepted by `-ss` and `-t`.
fn clock_time(d: Duration) -> String {
    let secs = (d.as_secs() % 86_400) as u32;
    chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "00:00:00".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> FilterSpec {
        FilterSpec {
            subtitle: Some("/out/tmp.mkv".to_string()),
            width: -2,
            height: 720,
            upscaling: false,
        }
    }

    fn command(profile: Profile) -> ProfileCommand {
        ProfileCommand::new(
            profile,
            "/usr/bin/ffmpeg",
            "/in/Show - 01.mkv",
            "/out",
            "1371k",
            filter(),
        )
    }

    fn args(inv: &Invocation) -> Vec<&str> {
        inv.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_mux_first_pass() {
        let first = command(Profile::Mux).first_pass();
        assert_eq!(first.program, PathBuf::from("/usr/bin/ffmpeg"));
        assert_eq!(first.working_dir, PathBuf::from("/out"));
        assert_eq!(
            args(&first),
            vec![
                "-y",
                "-i",
                "/in/Show - 01.mkv",
                "-pass",
                "1",
                "-c:v",
                "libx264",
                "-b:v",
                "1371k",
                "-tune",
                "animation",
                "-preset",
                "medium",
                "-pix_fmt",
                "yuv420p",
                "-filter_complex",
                "subtitles='/out/tmp.mkv', scale='min(-2,iw)':'min(720,ih)'",
                "-an",
                "-f",
                "mp4",
                DISCARD_TARGET,
            ]
        );
    }

    #[test]
    fn test_mux_second_pass() {
        let second = command(Profile::Mux).second_pass();
        assert_eq!(
            args(&second),
            vec![
                "-i",
                "/in/Show - 01.mkv",
                "-pass",
                "2",
                "-c:v",
                "libx264",
                "-b:v",
                "1371k",
                "-tune",
                "animation",
                "-preset",
                "medium",
                "-pix_fmt",
                "yuv420p",
                "-filter_complex",
                "subtitles='/out/tmp.mkv', scale='min(-2,iw)':'min(720,ih)'",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-ac",
                "2",
                "-sn",
                "Show - 01.mp4",
            ]
        );
    }

    #[test]
    fn test_hls_output_layout() {
        let cmd = command(Profile::FragmentedHls);
        assert_eq!(cmd.out_dir(), Path::new("/out/Show - 01"));
        assert_eq!(cmd.out_file(), HLS_PLAYLIST);

        let second = cmd.second_pass();
        assert_eq!(second.working_dir, PathBuf::from("/out/Show - 01"));
        assert_eq!(second.arg_value("-hls_flags"), Some("append_list"));
        assert_eq!(second.arg_value("-hls_time"), Some("10"));
        assert_eq!(second.arg_value("-hls_list_size"), Some("0"));
        assert_eq!(second.arg_value("-hls_segment_type"), Some("fmp4"));
        assert_eq!(second.args.last().map(String::as_str), Some("out.m3u8"));

        let first = cmd.first_pass();
        assert_eq!(first.arg_value("-hls_time"), None);
        assert_eq!(first.arg_value("-c:a"), None);
    }

    #[test]
    fn test_sample_seeks_in_both_passes() {
        let cmd = command(Profile::Sample);
        assert_eq!(cmd.out_file(), "Show - 01_sample.mp4");
        for pass in [cmd.first_pass(), cmd.second_pass()] {
            assert_eq!(pass.arg_value("-ss"), Some("00:01:00"));
            assert_eq!(pass.arg_value("-t"), Some("00:01:00"));
        }
    }

    #[test]
    fn test_transcode_keeps_streams_and_soft_subtitles() {
        let cmd = command(Profile::Transcode);
        assert_eq!(cmd.out_file(), "Show - 01.mkv");
        assert_eq!(cmd.out_dir(), Path::new("/out"));

        let second = cmd.second_pass();
        let a = args(&second);
        assert!(!a.contains(&"-c:v"));
        assert!(!a.contains(&"-ac"));
        assert!(!a.contains(&"-sn"));
        assert_eq!(
            second.arg_value("-filter_complex"),
            Some("scale='min(-2,iw)':'min(720,ih)'")
        );
        assert_eq!(second.arg_value("-c:s"), Some("copy"));
        assert_eq!(second.arg_value("-c:t"), Some("copy"));
        let maps: Vec<&str> = a
            .windows(2)
            .filter(|w| w[0] == "-map")
            .map(|w| w[1])
            .collect();
        assert_eq!(maps, vec!["0:a", "0:s", "0:t"]);
    }

    #[test]
    fn test_first_pass_only_carries_shared_options() {
        for profile in burner_media_model::MENU {
            let cmd = command(profile);
            let shared = cmd.options().iter().filter(|o| o.first_pass).count();
            let first = cmd.first_pass();
            let flags = first
                .args
                .iter()
                .filter(|a| a.starts_with('-') && a.as_str() != "-2")
                .count();
            // -y -i -pass plus -an -f
            assert_eq!(flags, shared + 5, "profile {profile}");
            assert!(cmd.options().iter().all(|o| o.second_pass));
        }
    }

    #[test]
    fn test_prepend_args() {
        let mut inv = command(Profile::Mux).first_pass();
        inv.prepend_args(["-hide_banner"]);
        assert_eq!(inv.args[0], "-hide_banner");
        assert_eq!(inv.args[1], "-y");
    }

    #[test]
    fn test_clock_time() {
        assert_eq!(clock_time(Duration::from_secs(60)), "00:01:00");
        assert_eq!(clock_time(Duration::from_secs(3_725)), "01:02:05");
    }
}
