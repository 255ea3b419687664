use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "dialogviz",
    version,
    about = "visual dialog results viewer",
    long_about = "dialogviz renders a visual dialog results file (images, captions and question/answer turns) as an HTML image grid.\n\nExamples:\n  dialogviz -i results/finalep6.json -o results.html\n  dialogviz -b http://localhost:8000/dialog_output/ -o results.html\n  dialogviz -i results/finalep6.json -A json\n\nTip: Use --config to persist settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long = "sl",
        visible_alias = "silent",
        help_heading = "Output",
        help = "Suppress status lines (errors are still printed)."
    )]
    pub silent: bool,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'i',
        long = "in",
        visible_alias = "input",
        value_name = "PATH|URL",
        help_heading = "Input",
        help = "Results file: local path, absolute URL, or path relative to --base-url (defaults to results/finalep6.json)."
    )]
    pub input: Option<String>,

    #[arg(
        short = 'b',
        long = "bu",
        visible_alias = "base-url",
        value_name = "URL",
        help_heading = "Input",
        help = "URL of the page hosting the viewer; relative inputs are fetched from it."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (see --init-config)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write a default config to ~/.dialogviz/config.yml (or --config) and exit."
    )]
    pub init_config: bool,

    #[arg(
        long = "ir",
        visible_alias = "image-root",
        value_name = "URL",
        help_heading = "Render",
        help = "Image host root prepended to COCO_val2014_<id>.jpg."
    )]
    pub image_root: Option<String>,

    #[arg(
        long = "ttl",
        visible_alias = "title",
        value_name = "TEXT",
        help_heading = "Render",
        help = "Page title for the standalone HTML output."
    )]
    pub title: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the rendered output to a file (stdout when unset)."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (page, fragment, json)."
    )]
    pub output_format: Option<String>,
}
