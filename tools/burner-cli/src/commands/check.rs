//! Check that the external tools are available.

use burner_transcode_engine::tools::check_all;

pub fn run(json: bool) -> anyhow::Result<()> {
    let tools = check_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("Burner System Check");
    println!("{}", "=".repeat(50));

    for tool in &tools {
        let status = match (tool.available, tool.required) {
            (true, _) => "[OK]",
            (false, true) => "[MISSING]",
            (false, false) => "[WARN]",
        };
        match (&tool.path, &tool.version) {
            (Some(path), Some(version)) => {
                println!("{status} {}: {} ({version})", tool.name, path.display())
            }
            (Some(path), None) => println!("{status} {}: {}", tool.name, path.display()),
            _ => println!("{status} {}: not found in PATH", tool.name),
        }
    }

    println!();
    if tools.iter().filter(|t| t.required).all(|t| t.available) {
        println!("All required tools are available. Burner is ready.");
    } else {
        println!("ffmpeg is missing. Install it and make sure it is in PATH.");
    }
    if tools.iter().any(|t| !t.required && !t.available) {
        println!("Without ffprobe the bitrate is never lowered to match the source.");
    }

    Ok(())
}
