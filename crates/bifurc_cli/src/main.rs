use anyhow::{bail, Context, Result};
use bifurc_cli::{logger, run, COMMANDS};

fn main() -> Result<()> {
    logger::init()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [command, path] = args.as_slice() else {
        bail!(
            "Usage: bifurc <command> <request.json>\nCommands: {}",
            COMMANDS.join(", ")
        );
    };

    let request =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let output = run(command, &request)?;
    println!("{output}");
    Ok(())
}
