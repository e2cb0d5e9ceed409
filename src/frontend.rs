//! 嵌入式页面模板渲染：登录表单与文件面板。

use axum::response::Html;
use rust_embed::RustEmbed;

use crate::error::ApiError;

#[derive(RustEmbed)]
#[folder = "templates"]
/// 嵌入式 HTML 模板。
pub struct PageTemplates;

const MAIN_TEMPLATE: &str = "main.html";
const CONTENT_SLOT: &str = "{{content}}";

/// 渲染主页面；仅在已授权时展示文件列表。
pub fn render_main_page(is_authorized: bool, files: &[String]) -> Result<Html<String>, ApiError> {
    let template = PageTemplates::get(MAIN_TEMPLATE)
        .ok_or_else(|| ApiError::Internal("Failed to render page".into()))?;
    let template = std::str::from_utf8(&template.data)
        .map_err(|_| ApiError::Internal("Failed to render page".into()))?;

    let content = if is_authorized {
        dashboard(files)
    } else {
        login_form()
    };
    Ok(Html(template.replace(CONTENT_SLOT, &content)))
}

fn login_form() -> String {
    r#"<h1>Sign in</h1>
<form method="post" action="/">
    <input type="text" name="username" placeholder="Username" autocomplete="username" required>
    <input type="password" name="password" placeholder="Password" autocomplete="current-password" required>
    <button type="submit">Log in</button>
</form>"#
        .to_string()
}

fn dashboard(files: &[String]) -> String {
    let mut html = String::from(
        r#"<h1>Files</h1>
<form method="post" action="/upload" enctype="multipart/form-data">
    <input type="file" name="file" required>
    <button type="submit">Upload</button>
</form>
"#,
    );

    if files.is_empty() {
        html.push_str("<p class=\"empty\">No files uploaded yet.</p>\n");
    } else {
        html.push_str("<ul class=\"files\">\n");
        for name in files {
            let text = escape_html(name);
            let query = urlencoding::encode(name);
            html.push_str(&format!(
                r#"    <li><a href="/download?filename={query}">{text}</a>
        <form method="post" action="/delete"><input type="hidden" name="filename" value="{text}"><button type="submit">Delete</button></form></li>
"#
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str(r#"<form method="post" action="/logout"><button type="submit">Log out</button></form>"#);
    html
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
