use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::model::{DialogRecord, ResultSet, Turn};
use crate::render::{self, RenderError, TemplateError};
use crate::runner::{Options, RenderedPage, Runner, RunnerError};
use crate::source::ResultSource;

fn dialog(n: usize) -> Vec<Value> {
    (0..n)
        .map(|j| json!({ "question": format!("q{j} "), "answer": format!("a{j}") }))
        .collect()
}

fn results_json(sample_words: Value, records: usize) -> Value {
    let data: Vec<Value> = (0..records)
        .map(|i| {
            json!({
                "image_id": 42 + i,
                "caption": format!("caption {i}"),
                "dialog": dialog(10),
            })
        })
        .collect();
    json!({
        "opts": {
            "encoder": "hre-ques-late-im-hist",
            "decoder": "gen",
            "beamSize": 5,
            "temperature": 1,
            "sampleWords": sample_words,
            "qbot": "checkpoints/custom_qbot.vd",
            "abot": "checkpoints/custom_abot.vd",
        },
        "data": data,
    })
}

fn results(sample_words: Value, records: usize) -> ResultSet {
    serde_json::from_value(results_json(sample_words, records)).unwrap()
}

fn record(image_id: u64, turns: usize) -> DialogRecord {
    DialogRecord {
        image_id: Some(image_id),
        caption: "a cat on a couch".to_string(),
        dialog: (0..turns)
            .map(|j| Turn {
                question: format!("question {j}"),
                answer: format!("answer {j}"),
            })
            .collect(),
    }
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("dialogviz-{}-{name}", std::process::id()))
}

#[test]
fn beam_heading_uses_fixed_checkpoint_labels() {
    let set = results(json!(0), 1);
    let heading = render::render_heading(&set.opts);
    assert_eq!(
        heading,
        "Encoder: hre-ques-late-im-hist, Decoder: gen, Beam size: 5\
         <br>Q-Bot: checkpoints/abot_sl_60.vd<br>A-Bot: checkpoints/qbot_sl_60.vd"
    );
    assert!(!heading.contains("custom_qbot"));
    assert!(!heading.contains("custom_abot"));
}

#[test]
fn sampling_heading_shows_temperature() {
    let set = results(json!(1), 1);
    let heading = render::render_heading(&set.opts);
    assert_eq!(
        heading,
        "Encoder: hre-ques-late-im-hist, Decoder: gen, Temperature: 1"
    );
    assert!(!heading.contains("Beam size"));
    assert!(!heading.contains("Q-Bot"));
}

#[test]
fn sample_words_uses_loose_zero() {
    for zero in [
        json!(0),
        json!(0.0),
        json!("0"),
        json!(" 0x0 "),
        json!(""),
        json!(false),
        json!([]),
        json!([0]),
        json!([""]),
    ] {
        let set = results(zero.clone(), 0);
        assert!(!set.opts.uses_sampling(), "{zero} should count as zero");
    }
    for nonzero in [
        json!(1),
        json!("1"),
        json!("0x10"),
        json!(true),
        json!(null),
        json!([0, 0]),
        json!({}),
    ] {
        let set = results(nonzero.clone(), 0);
        assert!(set.opts.uses_sampling(), "{nonzero} should count as nonzero");
    }
}

#[test]
fn missing_opts_render_undefined() {
    let set: ResultSet = serde_json::from_value(json!({ "opts": {}, "data": [] })).unwrap();
    assert_eq!(
        render::render_heading(&set.opts),
        "Encoder: undefined, Decoder: undefined, Temperature: undefined"
    );

    let set: ResultSet =
        serde_json::from_value(json!({ "opts": { "sampleWords": 0 }, "data": [] })).unwrap();
    assert!(render::render_heading(&set.opts).starts_with(
        "Encoder: undefined, Decoder: undefined, Beam size: undefined<br>"
    ));
}

#[test]
fn integral_temperature_prints_without_fraction() {
    let set: ResultSet = serde_json::from_value(json!({
        "opts": { "encoder": "e", "decoder": "d", "temperature": 1.0, "sampleWords": 1 },
        "data": [],
    }))
    .unwrap();
    assert!(render::render_heading(&set.opts).ends_with("Temperature: 1"));

    let set: ResultSet = serde_json::from_value(json!({
        "opts": { "encoder": "e", "decoder": "d", "temperature": 0.7, "sampleWords": 1 },
        "data": [],
    }))
    .unwrap();
    assert!(render::render_heading(&set.opts).ends_with("Temperature: 0.7"));
}

#[test]
fn image_id_is_padded_to_twelve_digits() {
    assert_eq!(render::pad_image_id(42), "000000000042");
    assert_eq!(render::pad_image_id(0), "000000000000");
    assert_eq!(render::pad_image_id(123_456_789_012), "123456789012");
    assert_eq!(render::pad_image_id(9_123_456_789_012), "123456789012");
}

#[test]
fn image_url_uses_coco_filename() {
    let url = render::image_url(render::DEFAULT_IMAGE_ROOT, &render::pad_image_id(42)).unwrap();
    assert_eq!(
        url,
        "http://images.cocodataset.org/val2014/COCO_val2014_000000000042.jpg"
    );
    assert!(url.ends_with("COCO_val2014_000000000042.jpg"));
}

#[test]
fn image_id_accepts_numeric_strings() {
    let rec: DialogRecord = serde_json::from_value(json!({
        "image_id": "42",
        "caption": "c",
        "dialog": [],
    }))
    .unwrap();
    assert_eq!(rec.image_id, Some(42));

    let negative: Result<DialogRecord, _> = serde_json::from_value(json!({
        "image_id": -1,
        "caption": "c",
        "dialog": [],
    }));
    assert!(negative.is_err());
}

#[test]
fn absent_or_non_numeric_image_id_renders_nan() {
    for raw in [json!({}), json!({ "image_id": "abc" }), json!({ "image_id": null })] {
        let mut value = raw.clone();
        value["caption"] = json!("c");
        value["dialog"] = Value::Array(dialog(5));
        let rec: DialogRecord = serde_json::from_value(value).unwrap();
        assert_eq!(rec.image_id, None, "{raw}");
        let card = render::render_card(0, &rec, render::DEFAULT_IMAGE_ROOT).unwrap();
        assert!(card.contains("<span> Image ID: 000000000NaN</span>"));
        assert!(card.contains("COCO_val2014_000000000NaN.jpg"));
    }
}

#[test]
fn absent_text_fields_render_undefined() {
    let rec: DialogRecord = serde_json::from_value(json!({
        "image_id": 1,
        "dialog": [{}, {}, {}, {}, { "question": "is it red? ", "answer": 3 }],
    }))
    .unwrap();
    assert_eq!(rec.caption, "undefined");
    assert_eq!(rec.dialog[0].question, "undefined");
    assert_eq!(rec.dialog[0].answer, "undefined");
    assert_eq!(rec.dialog[4].answer, "3");

    let card = render::render_card(0, &rec, render::DEFAULT_IMAGE_ROOT).unwrap();
    assert!(card.contains("<span> Caption: undefined</span>"));
    assert_eq!(
        card.matches("<span>undefined</span><span>undefined</span>")
            .count(),
        4
    );
    assert!(card.contains("<span>is it red? </span><span>3</span>"));
}

#[test]
fn template_substitutes_positional_arguments() {
    assert_eq!(
        render::format_template("{0}COCO_val2014_{1}.jpg", &["root/", "000000000001"]).unwrap(),
        "root/COCO_val2014_000000000001.jpg"
    );
    assert_eq!(
        render::format_template("{1}-{0}-{1}", &["a", "b"]).unwrap(),
        "b-a-b"
    );
    assert_eq!(
        render::format_template("no placeholders {x}", &[]).unwrap(),
        "no placeholders {x}"
    );
}

#[test]
fn template_fails_on_missing_argument() {
    assert_eq!(
        render::format_template("{0} and {2}", &["a", "b"]),
        Err(TemplateError::MissingArgument {
            index: 2,
            available: 2
        })
    );
}

#[test]
fn four_records_close_exactly_one_row() {
    let records: Vec<DialogRecord> = (0..4).map(|i| record(i, 5)).collect();
    let html = render::render_grid(&records, render::DEFAULT_IMAGE_ROOT).unwrap();
    assert_eq!(html.matches("<div class='row'>").count(), 1);
    assert_eq!(html.matches("</div><hr>").count(), 1);
    assert!(html.ends_with("</div><hr>"));
}

#[test]
fn fifth_record_opens_a_row_that_is_never_closed() {
    let records: Vec<DialogRecord> = (0..5).map(|i| record(i, 5)).collect();
    let html = render::render_grid(&records, render::DEFAULT_IMAGE_ROOT).unwrap();
    assert_eq!(html.matches("<div class='row'>").count(), 2);
    assert_eq!(html.matches("</div><hr>").count(), 1);

    let second_row = html.rfind("<div class='row'>").unwrap();
    let tail = &html[second_row..];
    assert!(tail.contains("Image ID: 000000000004"));
    assert!(!tail.contains("<hr>"));
    assert!(html.ends_with("</ol></div></div>"));
}

#[test]
fn card_lists_first_five_turns_in_order() {
    let card = render::render_card(0, &record(7, 8), render::DEFAULT_IMAGE_ROOT).unwrap();
    assert_eq!(card.matches("<li ").count(), 5);
    for j in 0..5 {
        assert!(card.contains(&format!(
            "<span>question {j}</span><span>answer {j}</span>"
        )));
    }
    assert!(!card.contains("question 5"));

    let first = card.find("question 0").unwrap();
    let last = card.find("question 4").unwrap();
    assert!(first < last);
}

#[test]
fn card_shows_image_id_and_caption() {
    let card = render::render_card(0, &record(42, 5), render::DEFAULT_IMAGE_ROOT).unwrap();
    assert!(card.starts_with("<div class='col-xs-3'>"));
    assert!(card.contains(
        "<img class='col-xs-12' src='http://images.cocodataset.org/val2014/COCO_val2014_000000000042.jpg'>"
    ));
    assert!(card.contains("<span> Image ID: 000000000042</span>"));
    assert!(card.contains("<span> Caption: a cat on a couch</span>"));
}

#[test]
fn card_text_is_escaped() {
    let mut rec = record(1, 5);
    rec.caption = "<b>bold</b> & 'quoted'".to_string();
    let card = render::render_card(0, &rec, render::DEFAULT_IMAGE_ROOT).unwrap();
    assert!(card.contains("Caption: &lt;b&gt;bold&lt;/b&gt; &amp; &#39;quoted&#39;"));
}

#[test]
fn short_dialog_aborts_the_grid() {
    let records = vec![record(1, 5), record(2, 3), record(3, 5)];
    let err = render::render_grid(&records, render::DEFAULT_IMAGE_ROOT).unwrap_err();
    assert_eq!(
        err,
        RenderError::ShortDialog {
            index: 1,
            image_id: "000000000002".to_string(),
            found: 3
        }
    );
}

#[test]
fn short_dialog_keeps_the_heading() {
    let mut set = results(json!(0), 3);
    set.data[1].dialog.truncate(3);

    let runner = Runner::new(Options::default()).unwrap();
    let err = runner.render(&set).unwrap_err();
    let heading = match err {
        RunnerError::Render { heading, source } => {
            assert!(matches!(source, RenderError::ShortDialog { index: 1, found: 3, .. }));
            heading
        }
        other => panic!("unexpected error: {other}"),
    };
    assert!(heading.starts_with("Encoder: hre-ques-late-im-hist, Decoder: gen, Beam size: 5"));

    let page = RenderedPage::heading_only(&runner.options().title, heading.clone());
    let doc = String::from_utf8(crate::output::render_page(&page)).unwrap();
    assert!(doc.contains(&format!("<h4 id='heading'>{heading}</h4>")));
    assert!(doc.contains("<div id='main' class='container-fluid'></div>"));
}

#[test]
fn runner_render_counts_records() {
    let runner = Runner::new(Options::default()).unwrap();
    let page = runner.render(&results(json!(0), 6)).unwrap();
    assert_eq!(page.records, 6);
    assert_eq!(page.main.matches("<div class='col-xs-3'>").count(), 6);
    assert!(page.heading.contains("Beam size: 5"));
}

#[test]
fn runner_rejects_empty_input_and_image_root() {
    let err = Runner::new(Options {
        input: "  ".to_string(),
        ..Options::default()
    })
    .unwrap_err();
    assert!(matches!(err, RunnerError::EmptyInput));

    let err = Runner::new(Options {
        image_root: String::new(),
        ..Options::default()
    })
    .unwrap_err();
    assert!(matches!(err, RunnerError::EmptyImageRoot));
}

#[test]
fn relative_input_resolves_against_base_url() {
    let source = ResultSource::resolve(
        "results/finalep6.json",
        Some("http://localhost:8000/dialog_output/index.html"),
    )
    .unwrap();
    assert_eq!(
        source,
        ResultSource::Url(
            reqwest::Url::parse("http://localhost:8000/dialog_output/results/finalep6.json")
                .unwrap()
        )
    );
}

#[test]
fn absolute_and_local_inputs_resolve() {
    let source = ResultSource::resolve("https://example.com/r.json", Some("http://other/")).unwrap();
    assert!(matches!(source, ResultSource::Url(u) if u.host_str() == Some("example.com")));

    let source = ResultSource::resolve("results/finalep6.json", None).unwrap();
    assert_eq!(
        source,
        ResultSource::File(std::path::PathBuf::from("results/finalep6.json"))
    );

    assert!(matches!(
        ResultSource::resolve("", None),
        Err(RunnerError::EmptyInput)
    ));
    assert!(matches!(
        ResultSource::resolve("r.json", Some("not a url")),
        Err(RunnerError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn url_parse_errors_keep_their_source() {
    let err = ResultSource::resolve("http://[::1", None).unwrap_err();
    assert!(matches!(err, RunnerError::InvalidInputUrl { .. }));
    assert!(std::error::Error::source(&err).is_some());

    let err = ResultSource::resolve("r.json", Some("::")).unwrap_err();
    assert!(matches!(err, RunnerError::InvalidBaseUrl { .. }));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn output_formats_parse_and_infer() {
    use crate::output::{infer_format_from_path, OutputFormat};
    assert_eq!(OutputFormat::parse("HTML"), Some(OutputFormat::Page));
    assert_eq!(OutputFormat::parse("frag"), Some(OutputFormat::Fragment));
    assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
    assert_eq!(OutputFormat::parse("xml"), None);
    assert_eq!(infer_format_from_path("out.htm"), Some(OutputFormat::Page));
    assert_eq!(infer_format_from_path("out.JSON"), Some(OutputFormat::Json));
    assert_eq!(infer_format_from_path("out.txt"), None);
}

#[test]
fn page_output_wraps_named_regions() {
    let runner = Runner::new(Options {
        title: "Run <6>".to_string(),
        ..Options::default()
    })
    .unwrap();
    let page = runner.render(&results(json!(0), 2)).unwrap();

    let doc = String::from_utf8(crate::output::render_page(&page)).unwrap();
    assert!(doc.starts_with("<!DOCTYPE html>"));
    assert!(doc.contains("<title>Run &lt;6&gt;</title>"));
    assert!(doc.contains(&format!("<h4 id='heading'>{}</h4>", page.heading)));
    assert!(doc.contains(&format!(
        "<div id='main' class='container-fluid'>{}</div>",
        page.main
    )));

    let fragment = String::from_utf8(crate::output::render_fragment(&page)).unwrap();
    assert!(fragment.starts_with("<h4 id='heading'>"));
    assert!(!fragment.contains("<!DOCTYPE html>"));

    let json_doc: Value = serde_json::from_slice(&crate::output::render_json(&page)).unwrap();
    assert_eq!(json_doc["records"], json!(2));
    assert_eq!(json_doc["heading"], json!(page.heading));
}

#[tokio::test]
async fn runner_loads_results_from_file() {
    let path = temp_path("results.json");
    std::fs::write(&path, results_json(json!(1), 5).to_string()).unwrap();

    let runner = Runner::new(Options {
        input: path.to_string_lossy().to_string(),
        ..Options::default()
    })
    .unwrap();
    let page = runner.run().await.unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(page.records, 5);
    assert!(page.heading.contains("Temperature: 1"));
    assert_eq!(page.main.matches("<div class='row'>").count(), 2);
    assert!(page.main.contains("COCO_val2014_000000000046.jpg"));
}

#[tokio::test]
async fn malformed_results_file_is_a_decode_error() {
    let path = temp_path("broken.json");
    std::fs::write(&path, "{ \"opts\": ").unwrap();

    let runner = Runner::new(Options {
        input: path.to_string_lossy().to_string(),
        ..Options::default()
    })
    .unwrap();
    let err = runner.run().await.unwrap_err();
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, RunnerError::Decode { .. }));
}

#[tokio::test]
async fn missing_results_file_is_a_read_error() {
    let runner = Runner::new(Options {
        input: temp_path("does-not-exist.json")
            .to_string_lossy()
            .to_string(),
        ..Options::default()
    })
    .unwrap();
    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, RunnerError::FileRead { .. }));
}

const HOSTED_RESULTS_PATH: &str = "/dialog_output/results/finalep6.json";

/// Serves `body` at the hosted results path, 404 for anything else.
async fn serve_results(body: String) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&chunk[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/");
                let (status, payload) = if path == HOSTED_RESULTS_PATH {
                    ("200 OK", body)
                } else {
                    ("404 Not Found", "not found".to_string())
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                    payload.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

#[tokio::test]
async fn runner_fetches_results_relative_to_base_url() {
    let addr = serve_results(results_json(json!(0), 4).to_string()).await;
    let runner = Runner::new(Options {
        base_url: Some(format!("http://{addr}/dialog_output/index.html")),
        ..Options::default()
    })
    .unwrap();

    assert_eq!(
        runner.source().unwrap().to_string(),
        format!("http://{addr}{HOSTED_RESULTS_PATH}")
    );
    let page = runner.run().await.unwrap();
    assert_eq!(page.records, 4);
    assert!(page.heading.contains("Beam size: 5"));
    assert_eq!(page.main.matches("<div class='row'>").count(), 1);
    assert_eq!(page.main.matches("</div><hr>").count(), 1);
}

#[tokio::test]
async fn missing_hosted_results_is_an_http_status_error() {
    let addr = serve_results(results_json(json!(0), 1).to_string()).await;
    let runner = Runner::new(Options {
        input: "results/missing.json".to_string(),
        base_url: Some(format!("http://{addr}/dialog_output/")),
        ..Options::default()
    })
    .unwrap();

    let err = runner.run().await.unwrap_err();
    match err {
        RunnerError::HttpStatus { url, status } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/dialog_output/results/missing.json"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
