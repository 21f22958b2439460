//! `InjectionScript`: the production page writer.
//!
//! The service cannot touch the tab itself, so locate/set steps are recorded and
//! rendered into one self-contained program for `chrome.scripting.executeScript`.
//! The program resolves each selector at run time, writes each field in the mode
//! the target asks for and returns `[{field, status}]` for `POST /api/v1/forms/report`.
//! A missing element, one of the wrong kind, or a write that throws is `not_found`
//! for that field only.

use async_trait::async_trait;
use serde::Serialize;

use super::bridge::{ElementHandle, FieldValue, FormAction, PageError, RemotePageWriter, WriteMode};
use crate::models::ad::AdField;

#[derive(Debug, Clone, Serialize)]
struct ScriptStep {
    field: AdField,
    selector: String,
    text: String,
    /// Pre-rendered `<p>` blocks for rich-text editors.
    html: String,
    mode: WriteMode,
}

#[derive(Debug, Clone)]
pub struct InjectionScript {
    action: FormAction,
    steps: Vec<ScriptStep>,
}

const PROGRAM: &str = r#"(() => {
  const steps = __STEPS__;
  const done = __DONE__;
  const setNative = (el, value) => {
    let proto;
    if (el instanceof HTMLTextAreaElement) proto = HTMLTextAreaElement.prototype;
    else if (el instanceof HTMLInputElement) proto = HTMLInputElement.prototype;
    else return false;
    Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, value);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
  };
  const setRich = (el, html) => {
    if (!el.isContentEditable) return false;
    el.focus();
    document.execCommand('selectAll', false, null);
    document.execCommand('delete', false, null);
    if (html) document.execCommand('insertHTML', false, html);
    return true;
  };
  return steps.map((step) => {
    try {
      const el = document.querySelector(step.selector);
      const written = !!el && (step.mode === 'rich_text'
        ? setRich(el, step.html)
        : setNative(el, step.text));
      return { field: step.field, status: written ? done : 'not_found' };
    } catch (e) {
      return { field: step.field, status: 'not_found' };
    }
  });
})()"#;

impl InjectionScript {
    pub fn new(action: FormAction) -> Self {
        Self {
            action,
            steps: Vec::new(),
        }
    }

    pub fn fields(&self) -> Vec<AdField> {
        self.steps.iter().map(|s| s.field).collect()
    }

    pub fn render(&self) -> Result<String, serde_json::Error> {
        let done = match self.action {
            FormAction::Fill => "filled",
            FormAction::Clear => "cleared",
        };
        Ok(PROGRAM
            .replace("__STEPS__", &serde_json::to_string(&self.steps)?)
            .replace("__DONE__", &serde_json::to_string(done)?))
    }
}

#[async_trait]
impl RemotePageWriter for InjectionScript {
    /// Always resolves; a missing element surfaces in the program's result.
    async fn locate(&mut self, field: AdField, selector: &str) -> Result<Option<ElementHandle>, PageError> {
        self.steps.push(ScriptStep {
            field,
            selector: selector.to_string(),
            text: String::new(),
            html: String::new(),
            mode: WriteMode::Plain,
        });
        Ok(Some(ElementHandle {
            id: self.steps.len() - 1,
            selector: selector.to_string(),
        }))
    }

    async fn set_value(&mut self, element: &ElementHandle, value: &FieldValue, mode: WriteMode) -> Result<(), PageError> {
        let step = self
            .steps
            .get_mut(element.id)
            .ok_or_else(|| PageError::Script(format!("unknown element {}", element.id)))?;
        step.text = value.text.clone();
        step.html = paragraph_html(&value.paragraphs);
        step.mode = mode;
        Ok(())
    }
}

/// One `<p>` per line, HTML-escaped; blank lines keep their height.
pub fn paragraph_html(paragraphs: &[String]) -> String {
    paragraphs
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                "<p><br></p>".to_string()
            } else {
                format!("<p>{}</p>", escape_html(line))
            }
        })
        .collect()
}

fn escape_html(text: &str) -> String {
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
