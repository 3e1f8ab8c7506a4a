use std::io::{self, BufRead, Write};

/// Asks a yes/no question on stderr. Only `y` and `yes` count as yes.
pub fn confirm(question: &str) -> io::Result<bool> {
    confirm_with(question, io::stdin().lock(), io::stderr())
}

fn confirm_with(question: &str, mut input: impl BufRead, mut output: impl Write) -> io::Result<bool> {
    write!(output, "{question} (y/N): ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
