//! Terminal detection.

use std::io::IsTerminal;

/// True when both stdin and stdout are attached to a terminal.
///
/// Interactive prompts and the disambiguation dialog are only offered in that case.
#[must_use]
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}
