use crate::cli::args::CliArgs;
use crate::output::OutputFormat;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected page, fragment, or json"
            ));
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.base_url.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --base-url '{raw}': {e}"))?;
    }
    if let Some(raw) = args.image_root.as_deref() {
        if raw.trim().is_empty() {
            return Err("invalid --image-root, expected a non-empty URL".to_string());
        }
    }
    if let Some(raw) = args.input.as_deref() {
        if raw.trim().is_empty() {
            return Err("invalid --input, expected a path or URL".to_string());
        }
    }
    Ok(())
}
