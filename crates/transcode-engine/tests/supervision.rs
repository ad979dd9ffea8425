#![cfg(unix)]

use std::path::PathBuf;

use burner_transcode_engine::{console, ClassifierChain, Console, Invocation, Supervisor};

fn shell(script: &str) -> Invocation {
    Invocation {
        program: PathBuf::from("/bin/sh"),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: std::env::temp_dir(),
    }
}

fn output(console: &Console<Vec<u8>>) -> String {
    let guard = console.lock().expect("console lock");
    String::from_utf8_lossy(guard.get_ref()).into_owned()
}

fn supervisor(
    tolerate_font_errors: bool,
    verbose: bool,
    stride: Option<usize>,
) -> (Supervisor<Vec<u8>>, Console<Vec<u8>>) {
    let console = console(Vec::new());
    let supervisor = Supervisor::new(
        console.clone(),
        ClassifierChain::standard(tolerate_font_errors, verbose),
        stride,
    );
    (supervisor, console)
}

#[test]
fn glyph_diagnostic_kills_the_process() {
    let (supervisor, console) = supervisor(false, false, None);
    let outcome = supervisor
        .run(&shell(
            r"printf '[Parsed_subtitles_0 @ 0x55d0] Glyph 0x266F not found, selecting one more font\n' >&2; exec sleep 5",
        ))
        .expect("spawn");

    assert!(outcome.was_killed);
    assert!(!outcome.exited_normally);
    assert!(!outcome.should_dump_tail());
    assert!(outcome.into_result().is_err());

    let text = output(&console);
    assert_eq!(text, "burner: was not able to find font for `♯` char\n");
}

#[test]
fn refuse_overwrite_kills_the_process() {
    let (supervisor, console) = supervisor(true, false, None);
    let outcome = supervisor
        .run(&shell(
            r"printf '%s\n' 'File '\''out.mp4'\'' already exists. Overwrite ? [y/N] Not overwriting - exiting' >&2; exec sleep 5",
        ))
        .expect("spawn");

    assert!(outcome.was_killed);
    assert_eq!(output(&console), "burner: File 'out.mp4' already exists.\n");
}

#[test]
fn tolerated_font_diagnostics_are_printed_when_verbose() {
    let (supervisor, console) = supervisor(true, true, None);
    let outcome = supervisor
        .run(&shell(
            r"printf '[Parsed_subtitles_0 @ 0x55d0] Glyph 0x266F not found\n' >&2",
        ))
        .expect("spawn");

    assert!(outcome.success());
    assert!(!outcome.was_killed);
    assert_eq!(
        output(&console),
        "[Parsed_subtitles_0 @ 0x55d0] Glyph 0x266F not found\n"
    );
}

#[test]
fn failure_dumps_the_last_five_lines() {
    let (supervisor, console) = supervisor(false, true, None);
    let outcome = supervisor
        .run(&shell(
            "for i in 1 2 3 4 5 6 7; do echo line$i >&2; done; exit 3",
        ))
        .expect("spawn");

    assert!(!outcome.exited_normally);
    assert!(!outcome.was_killed);
    assert!(outcome.should_dump_tail());
    assert_eq!(
        outcome.last_lines.iter().map(String::as_str).collect::<Vec<_>>(),
        ["line3", "line4", "line5", "line6", "line7"]
    );
    assert!(outcome.error.as_deref().is_some_and(|e| e.contains('3')));

    let text = output(&console);
    let relayed = "line1\nline2\nline3\nline4\nline5\nline6\nline7\n";
    let tail = "line3\nline4\nline5\nline6\nline7\n";
    assert_eq!(text, format!("{relayed}{tail}"));
}

#[test]
fn quiet_run_shows_only_stats_line_and_tail() {
    let (supervisor, console) = supervisor(false, false, None);
    let outcome = supervisor
        .run(&shell(
            r"printf 'Input #0, matroska\nStream mapping:\nframe=   10 fps=0.0\r' >&2; for i in 1 2 3 4 5; do echo line$i >&2; done; exit 1",
        ))
        .expect("spawn");

    assert!(outcome.should_dump_tail());
    assert_eq!(
        output(&console),
        "frame=   10 fps=0.0\r\nline1\nline2\nline3\nline4\nline5\n"
    );
}

#[test]
fn progress_blocks_are_summarized() {
    let (supervisor, console) = supervisor(false, false, Some(2));
    let outcome = supervisor
        .run(&shell(
            "for f in 1 2 3 4; do printf 'frame=%s\\nspeed=1.5x\\nprogress=continue\\n' $f; done; printf 'frame=5\\nprogress=end\\n'",
        ))
        .expect("spawn");

    assert!(outcome.success());
    assert_eq!(
        output(&console),
        "frame=2 speed=1.5x\rframe=4 speed=1.5x\rframe=5 speed=1.5x\r"
    );
}

#[test]
fn stdout_is_relayed_without_reducer() {
    let (supervisor, console) = supervisor(false, false, None);
    let outcome = supervisor.run(&shell("echo hello")).expect("spawn");

    assert!(outcome.success());
    assert_eq!(output(&console), "hello\n");
}
