use anyhow::Result;
use console::style;
use inquire::Confirm;

/// Ask before touching every file in a directory; `--force` skips the prompt
pub fn confirm_bulk(action: &str, dir: &std::path::Path, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }

    let answer = Confirm::new(&format!("{} every file in {}?", action, dir.display()))
        .with_default(false)
        .with_help_message("Pass --force to skip this prompt")
        .prompt()?;

    if !answer {
        println!("{} {} cancelled.", style("✗").red(), action);
    }
    Ok(answer)
}
