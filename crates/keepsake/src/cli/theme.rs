//! Dialoguer theme shared by interactive prompts.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// Cyan `?` prompts, green `✓` on success, red `✗` on error. Everything
/// renders to stderr so stdout stays clean.
pub fn keepsake_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().cyan(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}
