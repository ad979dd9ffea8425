use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use burner_common::{BurnerResult, VideoDefaults};
use burner_media_model::{expected_encoded_bytes, parse_bitrate, BitrateAdvice, Profile, MENU};
use burner_transcode_engine::{console, BurnSettings, Burner, DurationProbe};

struct FixedDuration(f64);

impl DurationProbe for FixedDuration {
    fn duration(&self, _input: &Path) -> BurnerResult<f64> {
        Ok(self.0)
    }
}

fn workspace(profile: Profile) -> (tempfile::TempDir, BurnSettings) {
    let root = tempfile::tempdir().expect("tempdir");
    let input_dir = root.path().join("in");
    let output_dir = root.path().join("out");
    fs::create_dir_all(&input_dir).expect("input dir");
    fs::create_dir_all(&output_dir).expect("output dir");
    let settings = BurnSettings {
        profile,
        input_dir,
        output_dir,
        video: VideoDefaults::default(),
        tolerate_font_errors: false,
        progress_stride: 4,
        verbose: false,
    };
    (root, settings)
}

fn burner(settings: BurnSettings, duration: f64) -> Burner<Vec<u8>> {
    Burner::with_probe(
        settings,
        PathBuf::from("ffmpeg"),
        Some(Box::new(FixedDuration(duration))),
        console(Vec::new()),
    )
    .expect("burner should accept existing directories")
}

#[test]
fn small_source_reduces_bitrate_in_both_passes() {
    for profile in MENU {
        let (_root, settings) = workspace(profile);
        let input = settings.input_dir.join("episode.mkv");
        let half = expected_encoded_bytes(1.0, parse_bitrate("1371k")) as usize / 2;
        fs::write(&input, vec![0u8; half]).expect("source file");

        let plan = burner(settings, 1.0)
            .plan(&input, Path::new("tmp.mkv"))
            .expect("plan");

        assert_eq!(plan.advice, Some(BitrateAdvice::Reduce(621)), "profile {profile}");
        assert_eq!(plan.bitrate, "621k");
        assert_eq!(plan.first_pass.arg_value("-b:v"), Some("621k"));
        assert_eq!(plan.second_pass.arg_value("-b:v"), Some("621k"));
        assert!(!plan.first_pass.args.iter().any(|a| a == "1371k"));
        assert!(!plan.second_pass.args.iter().any(|a| a == "1371k"));
    }
}

/// Log sink shared with a test subscriber.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn text(&self) -> String {
        let guard = self.0.lock().expect("log lock");
        String::from_utf8_lossy(&guard).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn reduction_is_logged_while_planning() {
    let (_root, settings) = workspace(Profile::Mux);
    let input = settings.input_dir.join("episode.mkv");
    let half = expected_encoded_bytes(1.0, 1371) as usize / 2;
    fs::write(&input, vec![0u8; half]).expect("source file");

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let b = burner(settings, 1.0);
    let plan = tracing::subscriber::with_default(subscriber, || {
        b.plan(&input, Path::new("tmp.mkv"))
    })
    .expect("plan");

    assert_eq!(plan.first_pass.arg_value("-b:v"), Some("621k"));
    let text = log.text();
    assert!(text.contains("bitrate was modified to 621k"), "log: {text}");
    assert!(text.contains("from=1371k"), "log: {text}");
}

#[test]
fn kept_bitrate_is_not_logged() {
    let (_root, mut settings) = workspace(Profile::Mux);
    settings.video.keep_bitrate = true;
    let input = settings.input_dir.join("episode.mkv");
    fs::write(&input, b"x").expect("source file");

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let b = burner(settings, 1.0);
    let plan = tracing::subscriber::with_default(subscriber, || {
        b.plan(&input, Path::new("tmp.mkv"))
    })
    .expect("plan");

    assert_eq!(plan.advice, None);
    assert_eq!(plan.first_pass.arg_value("-b:v"), Some("1371k"));
    assert!(!log.text().contains("bitrate was modified"));
}

#[test]
fn large_source_keeps_requested_bitrate() {
    let (_root, settings) = workspace(Profile::Mux);
    let input = settings.input_dir.join("episode.mkv");
    let expected = expected_encoded_bytes(1.0, 1371) as usize;
    fs::write(&input, vec![0u8; expected + 1]).expect("source file");

    let plan = burner(settings, 1.0)
        .plan(&input, Path::new("tmp.mkv"))
        .expect("plan");

    assert_eq!(plan.advice, Some(BitrateAdvice::Keep));
    assert_eq!(plan.first_pass.arg_value("-b:v"), Some("1371k"));
    assert_eq!(plan.second_pass.arg_value("-b:v"), Some("1371k"));
}

#[test]
fn hls_output_lands_in_stem_directory() {
    let (_root, settings) = workspace(Profile::FragmentedHls);
    let input = settings.input_dir.join("Show - 01.mkv");
    fs::write(&input, b"x").expect("source file");

    let b = burner(settings, 1.0);
    let plan = b.plan(&input, Path::new("tmp.mkv")).expect("plan");
    let expected_dir = b.settings().output_dir.join("Show - 01");
    assert_eq!(plan.command.out_dir(), expected_dir.as_path());
    assert_eq!(plan.second_pass.working_dir, expected_dir);
    assert_eq!(plan.first_pass.working_dir, expected_dir);
}
