use serde::Serialize;

use crate::render::page;
use crate::runner::RenderedPage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Page,
    Fragment,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "page" | "html" | "htm" => Some(Self::Page),
            "fragment" | "frag" => Some(Self::Fragment),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Page);
    }
    None
}

#[derive(Serialize)]
struct JsonPage<'a> {
    title: &'a str,
    heading: &'a str,
    main: &'a str,
    records: usize,
}

pub fn render_page(rendered: &RenderedPage) -> Vec<u8> {
    page::render_document(&rendered.title, &rendered.heading, &rendered.main).into_bytes()
}

pub fn render_fragment(rendered: &RenderedPage) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&page::heading_region(&rendered.heading));
    out.push('\n');
    out.push_str(&page::main_region(&rendered.main));
    out.push('\n');
    out.into_bytes()
}

pub fn render_json(rendered: &RenderedPage) -> Vec<u8> {
    let doc = JsonPage {
        title: &rendered.title,
        heading: &rendered.heading,
        main: &rendered.main,
        records: rendered.records,
    };
    serde_json::to_vec_pretty(&doc).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render(format: OutputFormat, rendered: &RenderedPage) -> Vec<u8> {
    match format {
        OutputFormat::Page => render_page(rendered),
        OutputFormat::Fragment => render_fragment(rendered),
        OutputFormat::Json => render_json(rendered),
    }
}
