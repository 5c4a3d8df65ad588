//! Template Rendering
//!
//! Minimal `${variable}` substitution used to render backend executor
//! configuration files. Rendering is strict: every `${...}` placeholder in
//! the template must have a substitution, so a template/config drift fails
//! at launch time instead of producing a broken executor config.

use crate::error::{LaunchError, Result};

/// Substitutes `${name}` placeholders in `template` with the provided values.
///
/// Returns a `Validation` error when a placeholder has no substitution.
pub fn render_template(template: &str, substitutions: &[(&str, String)]) -> Result<String> {
    let mut rendered = template.to_string();
    for (name, value) in substitutions {
        rendered = rendered.replace(&format!("${{{}}}", name), value);
    }

    if let Some(start) = rendered.find("${") {
        let tail: String = rendered[start..].chars().take(40).collect();
        return Err(LaunchError::validation(format!(
            "Unresolved template placeholder near '{}'",
            tail
        )));
    }

    Ok(rendered)
}
