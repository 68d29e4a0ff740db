use crate::data_models::{SearchResponse, SearchResults, SimilarIssue, Solution};

pub const SIMILAR_HEADING: &str = "Issues that may be similar to yours:";
pub const CONTEXT_LABEL: &str = "View in context: ";

/// Escape text for use inside element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One appended child of the `.results` container.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultNode {
    Solution(Solution),
    Divider,
    SimilarIssues(Vec<SimilarIssue>),
}

/// Nodes for a response body, in display order: solutions as received, a
/// divider only when both groups are present, then the similar-issue panel.
pub fn build_nodes(results: &SearchResults) -> Vec<ResultNode> {
    let mut nodes: Vec<ResultNode> = results
        .solutions
        .iter()
        .cloned()
        .map(ResultNode::Solution)
        .collect();

    if !results.solutions.is_empty() && !results.similar.is_empty() {
        nodes.push(ResultNode::Divider);
    }

    if !results.similar.is_empty() {
        nodes.push(ResultNode::SimilarIssues(results.similar.clone()));
    }
    nodes
}

fn external_link(url: &str) -> String {
    let url = escape_html(url);
    format!(r#"<a href="{url}" target="_blank" rel="noopener noreferrer">{url}</a>"#)
}

pub fn render_node(node: &ResultNode) -> String {
    match node {
        ResultNode::Solution(sol) => {
            let mut out = String::new();
            out.push_str(r#"<div class="panel panel-default">"#);
            out.push_str(r#"<div class="panel-body">"#);
            out.push_str(&format!("<p>{}</p>", escape_html(&sol.body)));
            out.push_str(&format!(
                r#"<p class="comment-link"><span>{}</span>{}</p>"#,
                CONTEXT_LABEL,
                external_link(&sol.html_url)
            ));
            out.push_str("</div>");
            out.push_str(&format!(
                r#"<div class="panel-footer suggestion-score text-success"><i class="fa fa-thumbs-up"></i><span>{}</span></div>"#,
                sol.positive_score
            ));
            out.push_str("</div>");
            out
        }
        ResultNode::Divider => r#"<hr class="result-divider">"#.to_string(),
        ResultNode::SimilarIssues(issues) => {
            let mut out = String::new();
            out.push_str(r#"<div class="panel panel-default similar-issues">"#);
            out.push_str(&format!(
                r#"<div class="panel-heading"><h3 class="panel-title">{SIMILAR_HEADING}</h3></div>"#
            ));
            out.push_str(r#"<ul class="list-group">"#);
            for issue in issues {
                out.push_str(&format!(
                    r#"<li class="list-group-item"><p>{}</p><p>{}</p></li>"#,
                    escape_html(&issue.title),
                    external_link(&issue.html_url)
                ));
            }
            out.push_str("</ul></div>");
            out
        }
    }
}

/// Plain text rendering for terminals.
pub fn render_node_text(node: &ResultNode) -> String {
    match node {
        ResultNode::Solution(sol) => format!(
            "{}\n  {}{}\n  +{}\n",
            sol.body.trim(),
            CONTEXT_LABEL,
            sol.html_url,
            sol.positive_score
        ),
        ResultNode::Divider => "----\n".to_string(),
        ResultNode::SimilarIssues(issues) => {
            let mut out = format!("{SIMILAR_HEADING}\n");
            for issue in issues {
                out.push_str(&format!("  - {}\n    {}\n", issue.title, issue.html_url));
            }
            out
        }
    }
}

fn hidden(visible: bool) -> &'static str {
    if visible { "" } else { " hidden" }
}

/// Visibility and content of everything the search form controls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultArea {
    pub loader_visible: bool,
    pub result_section_visible: bool,
    pub no_results_visible: bool,
    pub error_visible: bool,
    pub error_message: String,
    pub query_label: String,
    pub nodes: Vec<ResultNode>,
}

impl ResultArea {
    /// Loader on, everything else hidden and emptied.
    pub fn begin_loading(&mut self) {
        self.loader_visible = true;
        self.result_section_visible = false;
        self.no_results_visible = false;
        self.error_visible = false;
        self.error_message.clear();
        self.nodes.clear();
    }

    /// Returns whether the result section was revealed.
    pub fn show_response(&mut self, res: &SearchResponse) -> bool {
        self.loader_visible = false;
        self.error_visible = false;
        self.query_label = format!("\"{}\"", res.q);
        if res.has_results {
            self.nodes = build_nodes(&res.results);
            self.result_section_visible = true;
            self.no_results_visible = false;
        } else {
            self.nodes.clear();
            self.result_section_visible = false;
            self.no_results_visible = true;
        }
        res.has_results
    }

    pub fn show_error(&mut self, message: String) {
        self.loader_visible = false;
        self.result_section_visible = false;
        self.no_results_visible = false;
        self.nodes.clear();
        self.error_visible = true;
        self.error_message = message;
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            r#"<div class="loader{}"><i class="fa fa-spinner fa-spin"></i></div>"#,
            hidden(self.loader_visible)
        ));
        out.push_str(&format!(
            r#"<div class="alert alert-danger error-message{}">{}</div>"#,
            hidden(self.error_visible),
            escape_html(&self.error_message)
        ));
        out.push_str(&format!(
            r#"<section class="result-section{}"><h2>Results for <span class="query">{}</span></h2><div class="results">"#,
            hidden(self.result_section_visible),
            escape_html(&self.query_label)
        ));
        for node in &self.nodes {
            out.push_str(&render_node(node));
        }
        out.push_str("</div></section>");
        out.push_str(&format!(
            r#"<div class="no-results{}"><p>No results found for this issue.</p></div>"#,
            hidden(self.no_results_visible)
        ));
        out
    }

    pub fn to_text(&self) -> String {
        if self.loader_visible {
            return "Searching...\n".to_string();
        }
        if self.error_visible {
            return format!("Search failed: {}\n", self.error_message);
        }
        if self.no_results_visible {
            return "No results found for this issue.\n".to_string();
        }
        if !self.result_section_visible {
            return String::new();
        }
        let mut out = format!("Results for {}\n\n", self.query_label);
        for node in &self.nodes {
            out.push_str(&render_node_text(node));
            out.push('\n');
        }
        out
    }
}

/// Full search page around a result area.
pub fn render_page(query: &str, slider: u8, area: &ResultArea) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">");
    out.push_str("<title>Issue Analyzer</title>");
    out.push_str(r#"<link rel="stylesheet" href="/static/style.css">"#);
    out.push_str("</head><body><main class=\"container\">");
    out.push_str(r#"<form id="searchForm" method="get" action="">"#);
    out.push_str(&format!(
        r#"<input type="search" name="q" value="{}" placeholder="Describe your issue">"#,
        escape_html(query)
    ));
    out.push_str(&format!(
        r#"<input type="range" name="slider" min="1" max="4" step="1" value="{slider}">"#
    ));
    out.push_str(r#"<button type="submit">Search</button></form>"#);
    out.push_str(&area.to_html());
    out.push_str("</main></body></html>\n");
    out
}

#[test]
fn test_escape_html() {
    assert_eq!(escape_html("plain"), "plain");
    assert_eq!(
        escape_html(r#"<a href="x">'&'</a>"#),
        "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
    );
}
