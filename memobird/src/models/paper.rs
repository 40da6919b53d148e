//! 纸条内容
//!
//! 咕咕机只接受受限的HTML,样式表支持有限。这里只负责拼装文本段落和图片,
//! 并提供一个浏览器预览页用于调试。

/// 默认打印宽度 (像素),部分型号为576
pub const DEFAULT_PAPER_WIDTH: u32 = 384;

const PREVIEW_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8" />
        <style>
            * {
                padding: 0;
                margin: 0;
            }
            html {
                background-color: gray;
                width: 100%;
                height: 100%;
            }
            body {
                display: flex;
                align-items: center;
                justify-content: center;
                overflow: hidden;
                width: 100%;
                height: 100%;
            }
            #_body_ {
                box-sizing: border-box;
                background-color: white;
                padding: 32px 16px;
                max-height: 100%;
                overflow-y: auto;
                overflow-x: hidden;
            }
            #_content_ {
                border: 1px dotted black;
                width: {WIDTH}px;
                box-sizing: content-box;
            }
        </style>
    </head>
    <body>
        <div id="_body_">
            <div id="_content_">
                {CONTENT}
            </div>
        </div>
    </body>
</html>
"#;

/// 纸条元素
///
/// 同一种元素共享一段样式,`kind` 用于去重。
pub trait PaperItem: Send + Sync {
    /// 元素种类标识
    fn kind(&self) -> &'static str;

    /// 该种类元素的公共样式
    fn style_html(&self) -> &'static str;

    /// 元素自身的HTML
    fn html(&self) -> String;
}

/// 文本元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String,
}

impl TextItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl PaperItem for TextItem {
    fn kind(&self) -> &'static str {
        "text"
    }

    fn style_html(&self) -> &'static str {
        "<style>p._paper_text_ { overflow-wrap: break-word; }</style>"
    }

    fn html(&self) -> String {
        let body = escape_html(&self.text).replace('\r', "").replace('\n', "<br />");
        format!("<p class=\"_paper_text_\">{}</p>", body)
    }
}

/// 图片元素
///
/// `src` 需要是设备可访问的地址 (通常先上传),特殊字符需调用方转义。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    pub src: String,
}

impl ImageItem {
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }
}

impl PaperItem for ImageItem {
    fn kind(&self) -> &'static str {
        "image"
    }

    fn style_html(&self) -> &'static str {
        "<style>img._paper_img_ { max-width: 100%; }</style>"
    }

    fn html(&self) -> String {
        format!("<img class=\"_paper_img_\" src=\"{}\" />", self.src)
    }
}

/// 纸条
pub struct Paper {
    width: u32,
    items: Vec<Box<dyn PaperItem>>,
}

impl Paper {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            items: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn append(&mut self, item: impl PaperItem + 'static) -> &mut Self {
        self.items.push(Box::new(item));
        self
    }

    pub fn append_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.append(TextItem::new(text))
    }

    pub fn append_image(&mut self, src: impl Into<String>) -> &mut Self {
        self.append(ImageItem::new(src))
    }

    /// 发送给设备的HTML
    pub fn html(&self) -> String {
        let mut kinds: Vec<&'static str> = Vec::new();
        let mut styles: Vec<&'static str> = Vec::new();
        for item in &self.items {
            if !kinds.contains(&item.kind()) {
                kinds.push(item.kind());
                styles.push(item.style_html());
            }
        }

        let contents = self
            .items
            .iter()
            .map(|item| item.html())
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "<div id=\"_paper_\"><style>#_paper_ {{ overflow: hidden; width: {}px;}}#_paper_ * {{ max-width: 100%; }}</style>{}{}</div>",
            self.width,
            styles.join("\n"),
            contents
        )
    }

    /// 浏览器预览页
    pub fn preview_html(&self) -> String {
        PREVIEW_TEMPLATE
            .replace("{WIDTH}", &self.width.to_string())
            .replace("{CONTENT}", &self.html())
    }
}

impl Default for Paper {
    fn default() -> Self {
        Self::new(DEFAULT_PAPER_WIDTH)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_escaped_with_line_breaks() {
        let item = TextItem::new("Hello <World>\r\n咕咕咕 & \"ok\"");
        assert_eq!(
            item.html(),
            "<p class=\"_paper_text_\">Hello &lt;World&gt;<br />咕咕咕 &amp; &quot;ok&quot;</p>"
        );
    }

    #[test]
    fn test_image_html() {
        let item = ImageItem::new("http://w.memobird.cn/cn/a.jpg");
        assert_eq!(
            item.html(),
            "<img class=\"_paper_img_\" src=\"http://w.memobird.cn/cn/a.jpg\" />"
        );
    }

    #[test]
    fn test_styles_deduplicated_in_first_appearance_order() {
        let mut paper = Paper::default();
        paper
            .append_image("a.jpg")
            .append_text("one")
            .append_image("b.jpg")
            .append_text("two");

        let html = paper.html();
        assert_eq!(html.matches("img._paper_img_ {").count(), 1);
        assert_eq!(html.matches("p._paper_text_ {").count(), 1);
        assert!(html.find("img._paper_img_").unwrap() < html.find("p._paper_text_").unwrap());
        assert!(html.starts_with("<div id=\"_paper_\"><style>#_paper_ { overflow: hidden; width: 384px;}"));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn test_custom_width() {
        let paper = Paper::new(576);
        assert!(paper.html().contains("width: 576px;"));
        assert!(paper.preview_html().contains("width: 576px;"));
    }

    #[test]
    fn test_preview_embeds_content() {
        let mut paper = Paper::default();
        paper.append_text("preview me");
        let page = paper.preview_html();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("preview me"));
        assert!(!page.contains("{CONTENT}"));
    }

    #[test]
    fn test_custom_item() {
        struct Rule;
        impl PaperItem for Rule {
            fn kind(&self) -> &'static str {
                "rule"
            }
            fn style_html(&self) -> &'static str {
                "<style>hr._paper_rule_ { border: 0; }</style>"
            }
            fn html(&self) -> String {
                "<hr class=\"_paper_rule_\" />".to_string()
            }
        }

        let mut paper = Paper::default();
        paper.append(Rule).append_text("after");
        let html = paper.html();
        assert!(html.contains("<hr class=\"_paper_rule_\" />\n<p"));
    }
}
