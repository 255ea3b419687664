use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template placeholder {{{index}}} has no argument ({available} provided)")]
    MissingArgument { index: usize, available: usize },
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("static placeholder regex"))
}

/// Substitutes `{N}` placeholders with `args[N]`.
///
/// Fails on the first placeholder whose index is past the end of `args`.
pub fn format_template(template: &str, args: &[&str]) -> Result<String, TemplateError> {
    let re = placeholder_regex();
    for caps in re.captures_iter(template) {
        let index = caps[1].parse::<usize>().unwrap_or(usize::MAX);
        if index >= args.len() {
            return Err(TemplateError::MissingArgument {
                index,
                available: args.len(),
            });
        }
    }
    let out = re.replace_all(template, |caps: &Captures<'_>| {
        let index = caps[1].parse::<usize>().unwrap_or(usize::MAX);
        args.get(index).copied().unwrap_or_default().to_string()
    });
    Ok(out.into_owned())
}
