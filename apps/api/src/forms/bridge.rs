//! Writing ad records into a third-party form through a [`RemotePageWriter`].
//!
//! Nothing here fails the caller: a missing selector or a tab that navigated
//! away is reported per field as `not_found`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::FormTarget;
use crate::models::ad::{AdField, AdRecord};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("The tab navigated away from the form")]
    Detached,

    #[error("Page script failed: {0}")]
    Script(String),
}

/// An element located on the external page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub id: usize,
    pub selector: String,
}

/// Value to write, in both shapes: plain inputs take `text`, rich-text editors
/// take one paragraph per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub text: String,
    pub paragraphs: Vec<String>,
}

impl FieldValue {
    /// Bold markers are dropped; the forms take plain text only.
    pub fn new(raw: &str) -> Self {
        let text = raw.replace("**", "");
        let paragraphs = text.lines().map(str::to_string).collect();
        Self { text, paragraphs }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// How a value reaches the element, chosen by the target's `editable` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Native value setter, then bubbling `input` and `change` events.
    Plain,
    /// Focus, select-all, delete and an insert editing command.
    RichText,
}

/// The page side of the bridge. An element that cannot take a value in the
/// requested mode is an error, which the bridge reports as `not_found`.
#[async_trait]
pub trait RemotePageWriter: Send {
    async fn locate(&mut self, field: AdField, selector: &str) -> Result<Option<ElementHandle>, PageError>;

    async fn set_value(&mut self, element: &ElementHandle, value: &FieldValue, mode: WriteMode) -> Result<(), PageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormAction {
    Fill,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Filled,
    Cleared,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResult {
    pub field: AdField,
    pub status: FieldStatus,
}

/// `Nothing` (serialized `none`) is a distinct outcome from a partial write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOutcome {
    Complete,
    Partial,
    #[serde(rename = "none")]
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub action: FormAction,
    pub attempted: usize,
    pub succeeded: usize,
    pub outcome: FillOutcome,
    pub results: Vec<FieldResult>,
    /// Status line for the panel.
    pub message: String,
}

impl FillReport {
    pub fn from_results(action: FormAction, results: Vec<FieldResult>) -> Self {
        let attempted = results.len();
        let succeeded = results
            .iter()
            .filter(|r| r.status != FieldStatus::NotFound)
            .count();
        let outcome = match succeeded {
            0 => FillOutcome::Nothing,
            n if n == attempted => FillOutcome::Complete,
            _ => FillOutcome::Partial,
        };
        let message = match (outcome, action) {
            (FillOutcome::Nothing, _) => "Поля не найдены".to_string(),
            (FillOutcome::Complete, FormAction::Fill) => format!("Вставлено {succeeded}"),
            (FillOutcome::Partial, FormAction::Fill) => format!("Вставлено {succeeded} из {attempted}"),
            (FillOutcome::Complete, FormAction::Clear) => format!("Очищено {succeeded}"),
            (FillOutcome::Partial, FormAction::Clear) => format!("Очищено {succeeded} из {attempted}"),
        };
        Self {
            action,
            attempted,
            succeeded,
            outcome,
            results,
            message,
        }
    }
}

async fn write_one<W>(page: &mut W, field: AdField, selector: &str, value: &FieldValue, mode: WriteMode) -> bool
where
    W: RemotePageWriter + ?Sized,
{
    let element = match page.locate(field, selector).await {
        Ok(Some(element)) => element,
        Ok(None) => {
            debug!("No element for {field} at '{selector}'");
            return false;
        }
        Err(e) => {
            warn!("Locating {field} failed: {e}");
            return false;
        }
    };
    match page.set_value(&element, value, mode).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Writing {field} failed: {e}");
            false
        }
    }
}

/// Writes every field present in both the record and the target.
pub async fn fill<W>(page: &mut W, record: &AdRecord, target: &FormTarget) -> FillReport
where
    W: RemotePageWriter + ?Sized,
{
    let mode = target.write_mode();
    let mut results = Vec::new();
    for (field, value) in record.fields.present() {
        let Some(selector) = target.fields.get(&field) else {
            continue;
        };
        let status = if write_one(page, field, selector, &FieldValue::new(value), mode).await {
            FieldStatus::Filled
        } else {
            FieldStatus::NotFound
        };
        results.push(FieldResult { field, status });
    }
    FillReport::from_results(FormAction::Fill, results)
}

/// Resets every field the target knows to empty.
pub async fn clear<W>(page: &mut W, target: &FormTarget) -> FillReport
where
    W: RemotePageWriter + ?Sized,
{
    let mode = target.write_mode();
    let mut results = Vec::new();
    for (&field, selector) in &target.fields {
        let status = if write_one(page, field, selector, &FieldValue::empty(), mode).await {
            FieldStatus::Cleared
        } else {
            FieldStatus::NotFound
        };
        results.push(FieldResult { field, status });
    }
    FillReport::from_results(FormAction::Clear, results)
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::testing::{ElementKind, FakePage, PageOp};
    use super::*;
    use crate::models::ad::FieldSet;

    fn target() -> FormTarget {
        FormTarget {
            id: "vk_ads".into(),
            label: "VK Реклама".into(),
            url_patterns: vec!["https://ads.vk.com/*".into()],
            fields: BTreeMap::from([
                (AdField::Headline, "#title".to_string()),
                (AdField::Text, "#text".to_string()),
                (AdField::LongDescription, "#long".to_string()),
            ]),
            editable: false,
            accepts: vec!["vk_universal".into()],
        }
    }

    fn rich_target() -> FormTarget {
        FormTarget {
            editable: true,
            ..target()
        }
    }

    fn record() -> AdRecord {
        AdRecord::new(
            "vk_universal",
            FieldSet {
                headline: Some("Ищем **курьеров**".into()),
                text: Some("Работа рядом с домом".into()),
                long_description: Some("Строка один\nСтрока <два>".into()),
                button_text: Some("Откликнуться".into()),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_fill_plain_inputs_use_native_setter_and_bubbling_events() {
        let mut page = FakePage::default()
            .with("#title", ElementKind::Input)
            .with("#text", ElementKind::TextArea)
            .with("#long", ElementKind::TextArea);
        let report = fill(&mut page, &record(), &target()).await;

        assert_eq!(report.outcome, FillOutcome::Complete);
        assert_eq!((report.attempted, report.succeeded), (3, 3));
        assert_eq!(report.message, "Вставлено 3");
        assert_eq!(page.value("#title"), Some("Ищем курьеров"));
        assert_eq!(
            &page.ops[..3],
            &[
                PageOp::NativeSet { selector: "#title".into(), value: "Ищем курьеров".into() },
                PageOp::Event { selector: "#title".into(), name: "input", bubbles: true },
                PageOp::Event { selector: "#title".into(), name: "change", bubbles: true },
            ]
        );
    }

    #[tokio::test]
    async fn test_fill_rich_text_goes_through_editing_commands() {
        let mut page = FakePage::default()
            .with("#title", ElementKind::RichText)
            .with("#text", ElementKind::RichText)
            .with("#long", ElementKind::RichText);
        let report = fill(&mut page, &record(), &rich_target()).await;
        assert_eq!(report.outcome, FillOutcome::Complete);
        assert!(!page.ops.iter().any(|op| matches!(op, PageOp::NativeSet { .. })));

        let rich: Vec<_> = page
            .ops
            .iter()
            .filter(|op| matches!(op, PageOp::Focus(s) | PageOp::ExecCommand { selector: s, .. } if s == "#long"))
            .cloned()
            .collect();
        assert_eq!(rich.len(), 4);
        assert_eq!(rich[0], PageOp::Focus("#long".into()));
        assert_eq!(
            rich[3],
            PageOp::ExecCommand {
                selector: "#long".into(),
                command: "insertHTML",
                arg: Some("<p>Строка один</p><p>Строка &lt;два&gt;</p>".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_element_of_the_wrong_kind_is_not_found() {
        let mut page = FakePage::default()
            .with("#title", ElementKind::Input)
            .with("#text", ElementKind::RichText)
            .with("#long", ElementKind::TextArea);
        let report = fill(&mut page, &record(), &target()).await;

        let statuses: Vec<_> = report.results.iter().map(|r| (r.field, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (AdField::Headline, FieldStatus::Filled),
                (AdField::Text, FieldStatus::NotFound),
                (AdField::LongDescription, FieldStatus::Filled),
            ]
        );
        assert_eq!(page.value("#text"), Some(""));

        let report = fill(&mut page, &record(), &rich_target()).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(page.value("#text"), Some("Работа рядом с домом"));
    }

    #[tokio::test]
    async fn test_partial_fill_is_distinct_from_none() {
        let mut page = FakePage::default().with("#title", ElementKind::Input);
        let report = fill(&mut page, &record(), &target()).await;
        assert_eq!(report.outcome, FillOutcome::Partial);
        assert_eq!(report.message, "Вставлено 1 из 3");

        let mut empty = FakePage::default();
        let report = fill(&mut empty, &record(), &target()).await;
        assert_eq!(report.outcome, FillOutcome::Nothing);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.message, "Поля не найдены");
    }

    #[tokio::test]
    async fn test_detached_tab_is_not_found_not_an_error() {
        let mut page = FakePage {
            detached: true,
            ..FakePage::default().with("#title", ElementKind::Input)
        };
        let report = fill(&mut page, &record(), &target()).await;
        assert_eq!(report.outcome, FillOutcome::Nothing);
        assert!(report.results.iter().all(|r| r.status == FieldStatus::NotFound));
    }

    #[tokio::test]
    async fn test_clear_reports_per_field() {
        let mut page = FakePage::default()
            .with("#title", ElementKind::Input)
            .with("#long", ElementKind::TextArea);
        page.elements.get_mut("#title").unwrap().1 = "старое".into();
        let report = clear(&mut page, &target()).await;

        assert_eq!(page.value("#title"), Some(""));
        let statuses: Vec<_> = report.results.iter().map(|r| (r.field, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (AdField::Headline, FieldStatus::Cleared),
                (AdField::Text, FieldStatus::NotFound),
                (AdField::LongDescription, FieldStatus::Cleared),
            ]
        );
        assert_eq!(report.message, "Очищено 2 из 3");
        assert!(!page.ops.iter().any(|op| matches!(op, PageOp::ExecCommand { command: "insertHTML", .. })));
    }
}
