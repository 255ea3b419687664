use std::process::exit;

fn main() {
    if let Err(e) = dialogviz::app::run_cli() {
        dialogviz::app::report_error(&e);
        exit(1);
    }
}
