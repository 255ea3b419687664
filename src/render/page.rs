use super::escape_html;

const BOOTSTRAP_CSS: &str =
    "https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap.min.css";

/// The heading region of the viewer page.
pub fn heading_region(heading: &str) -> String {
    format!("<h4 id='heading'>{heading}</h4>")
}

/// The grid region of the viewer page.
pub fn main_region(main: &str) -> String {
    format!("<div id='main' class='container-fluid'>{main}</div>")
}

pub fn render_document(title: &str, heading: &str, main: &str) -> String {
    let title = escape_html(title);
    let heading = heading_region(heading);
    let main = main_region(main);
    format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>{title}</title>
  <link href="{BOOTSTRAP_CSS}" rel="stylesheet"/>
  <style>
    body {{
      padding: 20px;
    }}
    #heading {{
      margin-bottom: 20px;
      line-height: 1.6;
    }}
    #main img {{
      padding: 0;
    }}
  </style>
</head>
<body>
  <div class="container-fluid">
    <h2>{title}</h2>
    {heading}
  </div>
  {main}
</body>
</html>
"####
    )
}
