pub mod page;
pub mod template;

use thiserror::Error;

use crate::model::{display_value, DialogRecord, RunOptions};

pub use template::{format_template, TemplateError};

pub const DEFAULT_IMAGE_ROOT: &str = "http://images.cocodataset.org/val2014/";

pub const IMAGE_FILE_TEMPLATE: &str = "{0}COCO_val2014_{1}.jpg";

pub const IMAGE_ID_WIDTH: usize = 12;

/// Turns rendered per card.
pub const TURNS_PER_CARD: usize = 5;

/// Cards grouped into one row container.
pub const CARDS_PER_ROW: usize = 4;

// Shown for every beam search run, whatever the qbot/abot options say.
const QBOT_CHECKPOINT_LABEL: &str = "Q-Bot: checkpoints/abot_sl_60.vd";
const ABOT_CHECKPOINT_LABEL: &str = "A-Bot: checkpoints/qbot_sl_60.vd";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("record {index} (image {image_id}) has {found} dialog turns, expected at least 5")]
    ShortDialog {
        index: usize,
        image_id: String,
        found: usize,
    },

    #[error("failed to build image url: {source}")]
    Template {
        #[from]
        source: TemplateError,
    },
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Left-pads the id with zeros to twelve digits. Longer ids keep their
/// last twelve digits.
pub fn pad_image_id(image_id: u64) -> String {
    let padded = format!("{:0>width$}", image_id, width = IMAGE_ID_WIDTH);
    padded[padded.len() - IMAGE_ID_WIDTH..].to_string()
}

/// Id label for a record; an absent or non-numeric id pads to `000000000NaN`.
pub fn image_id_label(image_id: Option<u64>) -> String {
    match image_id {
        Some(id) => pad_image_id(id),
        None => format!("{:0>width$}", "NaN", width = IMAGE_ID_WIDTH),
    }
}

pub fn image_url(image_root: &str, padded_id: &str) -> Result<String, TemplateError> {
    format_template(IMAGE_FILE_TEMPLATE, &[image_root, padded_id])
}

pub fn render_heading(opts: &RunOptions) -> String {
    let encoder = escape_html(&display_value(opts.encoder.as_ref()));
    let decoder = escape_html(&display_value(opts.decoder.as_ref()));
    if opts.uses_sampling() {
        let temperature = escape_html(&display_value(opts.temperature.as_ref()));
        format!("Encoder: {encoder}, Decoder: {decoder}, Temperature: {temperature}")
    } else {
        let beam_size = escape_html(&display_value(opts.beam_size.as_ref()));
        format!(
            "Encoder: {encoder}, Decoder: {decoder}, Beam size: {beam_size}<br>{QBOT_CHECKPOINT_LABEL}<br>{ABOT_CHECKPOINT_LABEL}"
        )
    }
}

pub fn render_card(
    index: usize,
    record: &DialogRecord,
    image_root: &str,
) -> Result<String, RenderError> {
    if record.dialog.len() < TURNS_PER_CARD {
        return Err(RenderError::ShortDialog {
            index,
            image_id: image_id_label(record.image_id),
            found: record.dialog.len(),
        });
    }

    let image_id = image_id_label(record.image_id);
    let image_src = image_url(image_root, &image_id)?;

    let mut out = String::new();
    out.push_str("<div class='col-xs-3'>");
    out.push_str(&format!(
        "<img class='col-xs-12' src='{}'>",
        escape_html(&image_src)
    ));
    out.push_str(&format!(
        "<p class='col-xs-12' style='font-weight:400'><span> Image ID: {image_id}</span></p>"
    ));
    out.push_str(&format!(
        "<p class='col-xs-12' style='font-weight:400'><span> Caption: {}</span></p>",
        escape_html(&record.caption)
    ));
    out.push_str("<div class='col-xs-12'><ol style='margin-top:10px;'>");
    for turn in record.dialog.iter().take(TURNS_PER_CARD) {
        out.push_str(&format!(
            "<li style='font-weight:400;'><span>{}</span><span>{}</span></li>",
            escape_html(&turn.question),
            escape_html(&turn.answer)
        ));
    }
    out.push_str("</ol></div></div>");
    Ok(out)
}

/// Renders all records as cards, four to a row.
///
/// A trailing partial row is opened but never closed.
pub fn render_grid(records: &[DialogRecord], image_root: &str) -> Result<String, RenderError> {
    let mut html = String::new();
    for (i, record) in records.iter().enumerate() {
        if i % CARDS_PER_ROW == 0 {
            html.push_str("<div class='row'>");
        }
        html.push_str(&render_card(i, record, image_root)?);
        if i % CARDS_PER_ROW == CARDS_PER_ROW - 1 {
            html.push_str("</div><hr>");
        }
    }
    Ok(html)
}
