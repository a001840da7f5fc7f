//! Tiny markdown → HTML renderer for model answers shown in the note editor.
//!
//! Supports `**bold**`, `__underline__`, `[text](url)` links, `*`/`-`
//! bullets and `1.` numbered lists. Everything else becomes a paragraph per
//! line; blank lines become `<br/>`.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("static regex"));
static UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.*?)__").expect("static regex"));
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("static regex"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[*\-]\s+(.*)$").expect("static regex"));
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("static regex"));

const LINK_STYLE: &str = "color: #22d3ee; text-decoration: underline;";

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
  Unordered,
  Ordered,
}

impl ListKind {
  fn tag(self) -> &'static str {
    match self {
      ListKind::Unordered => "ul",
      ListKind::Ordered => "ol",
    }
  }
}

pub fn render_markdown(text: &str) -> String {
  if text.is_empty() {
    return String::new();
  }

  let inline = BOLD.replace_all(text, "<strong>$1</strong>");
  let inline = UNDERLINE.replace_all(&inline, "<u>$1</u>");
  let link_tpl = format!("<a href=\"$2\" target=\"_blank\" rel=\"noopener noreferrer\" style=\"{}\">$1</a>", LINK_STYLE);
  let inline = LINK.replace_all(&inline, link_tpl.as_str());

  let mut out: Vec<String> = Vec::new();
  let mut open: Option<ListKind> = None;

  for line in inline.split('\n') {
    let item = BULLET.captures(line).map(|c| (ListKind::Unordered, c))
      .or_else(|| NUMBERED.captures(line).map(|c| (ListKind::Ordered, c)));

    match item {
      Some((kind, caps)) => {
        if open != Some(kind) {
          if let Some(prev) = open {
            out.push(format!("</{}>", prev.tag()));
          }
          out.push(format!("<{} class=\"sb-md-list\">", kind.tag()));
          open = Some(kind);
        }
        out.push(format!("<li>{}</li>", &caps[1]));
      }
      None => {
        if let Some(prev) = open.take() {
          out.push(format!("</{}>", prev.tag()));
        }
        if line.trim().is_empty() {
          out.push("<br/>".into());
        } else {
          out.push(format!("<p>{}</p>", line));
        }
      }
    }
  }

  if let Some(prev) = open {
    out.push(format!("</{}>", prev.tag()));
  }
  out.concat()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn inline_markup_is_converted() {
    let html = render_markdown("**Key** idea with __focus__ and [docs](https://example.com)");
    assert_eq!(
      html,
      "<p><strong>Key</strong> idea with <u>focus</u> and <a href=\"https://example.com\" target=\"_blank\" \
       rel=\"noopener noreferrer\" style=\"color: #22d3ee; text-decoration: underline;\">docs</a></p>"
    );
  }

  #[test]
  fn lists_open_and_close_around_items() {
    let html = render_markdown("Intro\n- one\n* two\n1. first\n2. second\n\nOutro");
    assert_eq!(
      html,
      "<p>Intro</p><ul class=\"sb-md-list\"><li>one</li><li>two</li></ul>\
       <ol class=\"sb-md-list\"><li>first</li><li>second</li></ol><br/><p>Outro</p>"
    );
  }

  #[test]
  fn summary_bullets_render_as_paragraphs() {
    assert_eq!(render_markdown("• a\n• b"), "<p>• a</p><p>• b</p>");
    assert_eq!(render_markdown(""), "");
  }
}
