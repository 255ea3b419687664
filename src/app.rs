use std::io::IsTerminal;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::output::{self, OutputFormat};
use crate::runner::{Options, RenderedPage, Runner, RunnerError, DEFAULT_TITLE};
use crate::{render, source};

/// Bracketed status lines on stderr, so stdout stays clean for the output.
#[derive(Clone, Copy, Debug)]
struct Console {
    verbose: u8,
    silent: bool,
}

impl Console {
    fn line(&self, tag: ColoredString, msg: &str) {
        eprintln!(
            "{}{}{} {}",
            "[".bold().white(),
            tag,
            "]".bold().white(),
            msg
        );
    }

    fn info(&self, msg: &str) {
        if !self.silent {
            self.line("INF".bold().blue(), msg);
        }
    }

    fn debug(&self, msg: &str) {
        if !self.silent && self.verbose > 0 {
            self.line("DBG".bold().purple(), msg);
        }
    }

    fn warn(&self, msg: &str) {
        if !self.silent {
            self.line("WRN".bold().yellow(), msg);
        }
    }

    fn error(&self, msg: &str) {
        self.line("ERR".bold().red(), msg);
    }

    fn kv(&self, label: &str, value: &str) {
        self.info(&format!(":: {:<10}: {}", label, value));
    }
}

/// One line per flag as `-s, --alias, --short <VALUE>`, grouped by help heading
/// in declaration order.
fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = format!(
        "{} {}\n",
        cmd.get_name(),
        cmd.get_version().unwrap_or_default()
    );
    if let Some(about) = cmd.get_long_about().or(cmd.get_about()) {
        out.push_str(&format!("\n{about}\n"));
    }
    out.push_str(&format!("\nUsage: {} [OPTIONS]\n", cmd.get_name()));

    let mut sections: Vec<(&str, Vec<&clap::Arg>)> = Vec::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options");
        match sections.iter_mut().find(|(h, _)| *h == heading) {
            Some((_, args)) => args.push(arg),
            None => sections.push((heading, vec![arg])),
        }
    }

    for (heading, args) in sections {
        out.push_str(&format!("\n{heading}:\n"));
        for arg in args {
            let mut names: Vec<String> = arg
                .get_short()
                .map(|s| format!("-{s}"))
                .into_iter()
                .collect();
            // Visible alias first: it is the readable name.
            let mut longs = arg.get_long_and_visible_aliases().unwrap_or_default();
            let n = longs.len();
            longs.rotate_left(1.min(n));
            names.extend(longs.iter().map(|l| format!("--{l}")));

            let mut line = names.join(", ");
            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|v| v.first())
                    .map(|v| v.as_str())
                    .unwrap_or("VALUE");
                line.push_str(&format!(" <{value_name}>"));
            }
            out.push_str(&format!("  {line}\n"));
            if let Some(help) = arg.get_help() {
                out.push_str(&format!("          {}\n", help.to_string().trim()));
            }
        }
    }

    out
}

#[derive(Clone, Debug)]
struct RunConfig {
    options: Options,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
    color: bool,
    silent: bool,
    verbose: u8,
}

fn resolve_output_format(
    raw: Option<&str>,
    output_path: Option<&str>,
) -> Result<OutputFormat, String> {
    if let Some(raw) = raw.filter(|r| !r.trim().is_empty()) {
        return OutputFormat::parse(raw).ok_or_else(|| {
            format!("invalid output format '{raw}', expected page, fragment, or json")
        });
    }
    Ok(output_path
        .and_then(output::infer_format_from_path)
        .unwrap_or(OutputFormat::Page))
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };
    let silent = args.silent || cfg.silent.unwrap_or(false);

    let input = args
        .input
        .or(cfg.input)
        .unwrap_or_else(|| source::DEFAULT_INPUT.to_string());
    let base_url = args.base_url.or(cfg.base_url).filter(|b| !b.trim().is_empty());
    let image_root = args
        .image_root
        .or(cfg.image_root)
        .unwrap_or_else(|| render::DEFAULT_IMAGE_ROOT.to_string());
    let title = args
        .title
        .or(cfg.title)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    let proxy = args.proxy.or(cfg.proxy).filter(|p| !p.trim().is_empty());

    let output = args
        .output
        .or(cfg.output)
        .filter(|o| !o.trim().is_empty())
        .map(|o| config::expand_tilde(&o).to_string_lossy().to_string());
    let output_format_raw = args.output_format.or(cfg.output_format);
    let output_format = resolve_output_format(output_format_raw.as_deref(), output.as_deref())?;

    Ok(RunConfig {
        options: Options {
            input,
            base_url,
            image_root,
            title,
            timeout_seconds: timeout,
            proxy,
        },
        output,
        output_format,
        no_color,
        color: args.color,
        silent,
        verbose: args.verbose,
    })
}

fn format_label(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Page => "page",
        OutputFormat::Fragment => "fragment",
        OutputFormat::Json => "json",
    }
}

fn loading_spinner(console: Console, label: &str) -> Result<Option<ProgressBar>, String> {
    if console.silent || !std::io::stderr().is_terminal() {
        return Ok(None);
    }
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} Loading :: [{elapsed_precise}] :: {msg}")
            .map_err(|e| format!("failed to build spinner style: {e}"))?,
    );
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(Some(pb))
}

async fn write_output(path: Option<&str>, rendered: &[u8]) -> Result<(), String> {
    match path {
        Some(path) => {
            let mut outfile = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .await
                .map_err(|e| format!("failed to open output file: {e}"))?;
            outfile
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write output file: {e}"))?;
            outfile
                .flush()
                .await
                .map_err(|e| format!("failed to flush output file: {e}"))
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write to stdout: {e}"))?;
            stdout
                .flush()
                .await
                .map_err(|e| format!("failed to flush stdout: {e}"))
        }
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.color {
        colored::control::set_override(true);
    } else if run.no_color {
        colored::control::set_override(false);
    }
    let console = Console {
        verbose: run.verbose,
        silent: run.silent,
    };
    let now = Instant::now();

    let runner = Runner::new(run.options).map_err(|e| e.to_string())?;
    let source = runner.source().map_err(|e| e.to_string())?;
    console.kv("Input", &source.to_string());
    console.kv("Images", &runner.options().image_root);
    console.kv(
        "Output",
        &format!(
            "{} ({})",
            run.output.as_deref().unwrap_or("stdout"),
            format_label(run.output_format)
        ),
    );

    let spinner = loading_spinner(console, &source.to_string())?;
    let loaded = runner.load().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let results = loaded.map_err(|e| e.to_string())?;
    console.debug(&format!(
        "loaded {} records, sampleWords branch: {}",
        results.data.len(),
        if results.opts.uses_sampling() {
            "temperature"
        } else {
            "beam search"
        }
    ));
    if results.data.is_empty() {
        console.warn("results file contains no records");
    }
    if results.data.len() % render::CARDS_PER_ROW != 0 {
        console.debug("last row holds fewer than four cards and is left open");
    }

    let rendered = match runner.render(&results) {
        Ok(rendered) => rendered,
        Err(RunnerError::Render { heading, source }) => {
            let partial = RenderedPage::heading_only(&runner.options().title, heading);
            let bytes = output::render(run.output_format, &partial);
            write_output(run.output.as_deref(), &bytes).await?;
            console.warn("grid aborted, wrote heading with an empty main region");
            return Err(format!("failed to render results: {source}"));
        }
        Err(e) => return Err(e.to_string()),
    };
    let bytes = output::render(run.output_format, &rendered);
    write_output(run.output.as_deref(), &bytes).await?;

    console.info(&format!(
        ":: Completed :: {} records rendered in {}ms ::",
        rendered.records,
        now.elapsed().as_millis()
    ));
    Ok(())
}

fn init_config(args: &CliArgs) -> Result<(), String> {
    let path = match args.config.as_deref() {
        Some(p) => config::expand_tilde(p),
        None => config::default_config_path()
            .ok_or_else(|| "could not determine home directory".to_string())?,
    };
    let console = Console {
        verbose: args.verbose,
        silent: args.silent,
    };
    if config::ensure_default_config_file(&path)? {
        console.info(&format!("wrote default config to {}", path.display()));
    } else {
        console.warn(&format!("config already exists at {}", path.display()));
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    if args.init_config {
        return init_config(&args);
    }

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}

/// Prints a CLI failure the same way the status lines are printed.
pub fn report_error(message: &str) {
    Console {
        verbose: 0,
        silent: false,
    }
    .error(message);
}
