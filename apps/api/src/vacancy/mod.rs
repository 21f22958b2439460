//! HH vacancy import: turns an hh.ru vacancy link into a ready-made description.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use axum::{extract::State, Json};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::{keys, save};

pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum VacancyError {
    #[error("Not an hh.ru vacancy link: {0}")]
    InvalidUrl(String),

    #[error("Vacancy {0} not found")]
    NotFound(String),

    #[error("HH API unreachable: {0}")]
    Network(String),

    #[error("HH API did not answer within {}s", LOOKUP_TIMEOUT.as_secs())]
    Timeout,

    #[error("HH API returned status {0}")]
    Status(u16),

    #[error("Unexpected HH API response: {0}")]
    Decode(String),
}

// ────────────────────────────────────────────────────────────────────────────
// HH API payload (only what the description uses)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Salary {
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub gross: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct Vacancy {
    pub name: String,
    pub employer: Option<Named>,
    pub salary: Option<Salary>,
    pub experience: Option<Named>,
    pub employment: Option<Named>,
    pub schedule: Option<Named>,
    pub area: Option<Named>,
    #[serde(default)]
    pub key_skills: Vec<Named>,
    pub description: Option<String>,
}

fn vacancy_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"hh\.ru/vacancy/(\d+)").expect("vacancy id regex"))
}

pub fn vacancy_id(url: &str) -> Result<&str, VacancyError> {
    vacancy_id_pattern()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| VacancyError::InvalidUrl(url.trim().to_string()))
}

#[derive(Clone)]
pub struct HhClient {
    client: Client,
    api_url: String,
}

impl HhClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            // HH rejects requests without a User-Agent.
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .context("Failed to build HH HTTP client")?;
        Ok(Self {
            client,
            api_url: config.hh_api_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch(&self, id: &str) -> Result<Vacancy, VacancyError> {
        let response = self
            .client
            .get(format!("{}/vacancies/{id}", self.api_url))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VacancyError::Timeout
                } else {
                    VacancyError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VacancyError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            warn!("HH API returned {status} for vacancy {id}");
            return Err(VacancyError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| VacancyError::Decode(e.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Formatting
// ────────────────────────────────────────────────────────────────────────────

/// Russian digit grouping with a no-break space, e.g. `80 000`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('\u{a0}');
        }
        out.push(c);
    }
    out
}

fn salary_line(salary: &Salary) -> String {
    let mut line = String::from("Зарплата: ");
    match (salary.from, salary.to) {
        (Some(from), Some(to)) => {
            line.push_str(&format!("от {} до {}", group_thousands(from), group_thousands(to)))
        }
        (Some(from), None) => line.push_str(&format!("от {}", group_thousands(from))),
        (None, Some(to)) => line.push_str(&format!("до {}", group_thousands(to))),
        (None, None) => {}
    }
    if let Some(currency) = salary.currency.as_deref().filter(|c| !c.is_empty()) {
        line.push(' ');
        line.push_str(currency);
    }
    line.push_str(if salary.gross { " (до вычета НДФЛ)" } else { " (на руки)" });
    line
}

/// Plain text of an HTML fragment: block ends become line breaks, tags are
/// dropped and the common entities decoded.
pub fn html_to_text(html: &str) -> String {
    static BLOCK_END: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    let block_end = BLOCK_END.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(?:p|li|h[1-6]|div|ul|ol)>").expect("block end regex")
    });
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("html tag regex"));

    let text = block_end.replace_all(html, "\n");
    let text = tag.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Description text in the order the writer prompt expects it.
pub fn format_description(vacancy: &Vacancy) -> String {
    let named = |label: &str, value: &Option<Named>| {
        value
            .as_ref()
            .filter(|v| !v.name.is_empty())
            .map(|v| format!("{label}: {}", v.name))
    };

    let mut parts = vec![format!("Профессия: {}", vacancy.name)];
    parts.extend(named("Компания", &vacancy.employer));
    parts.extend(vacancy.salary.as_ref().map(salary_line));
    parts.extend(named("Опыт", &vacancy.experience));
    parts.extend(named("Занятость", &vacancy.employment));
    parts.extend(named("График", &vacancy.schedule));
    parts.extend(named("Город", &vacancy.area));
    if !vacancy.key_skills.is_empty() {
        let skills: Vec<&str> = vacancy.key_skills.iter().map(|s| s.name.as_str()).collect();
        parts.push(format!("Навыки: {}", skills.join(", ")));
    }
    if let Some(text) = vacancy.description.as_deref().map(html_to_text).filter(|t| !t.is_empty()) {
        parts.push(format!("\nОписание:\n{text}"));
    }
    parts.join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Handler
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub vacancy_id: String,
    pub description: String,
}

/// POST /api/v1/vacancy/import
///
/// Fetches the vacancy, formats it and saves it as the description draft.
pub async fn handle_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let id = vacancy_id(&request.url)?.to_string();
    let vacancy = state.hh.fetch(&id).await?;
    let description = format_description(&vacancy);
    save(state.store.as_ref(), keys::AD_DESCRIPTION, &description).await?;
    info!("Imported HH vacancy {id} ({} chars)", description.chars().count());

    Ok(Json(ImportResponse {
        vacancy_id: id,
        description,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Option<Named> {
        Some(Named { name: name.to_string() })
    }

    #[test]
    fn test_vacancy_id_from_links() {
        assert_eq!(vacancy_id("https://hh.ru/vacancy/93533641?from=search").unwrap(), "93533641");
        assert_eq!(vacancy_id("https://spb.hh.ru/vacancy/1234").unwrap(), "1234");
        assert!(matches!(vacancy_id("https://hh.ru/employer/42"), Err(VacancyError::InvalidUrl(_))));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(950), "950");
        assert_eq!(group_thousands(80000), "80\u{a0}000");
        assert_eq!(group_thousands(1250000), "1\u{a0}250\u{a0}000");
    }

    #[test]
    fn test_salary_lines() {
        let both = Salary { from: Some(60000), to: Some(80000), currency: Some("RUR".into()), gross: true };
        assert_eq!(salary_line(&both), "Зарплата: от 60\u{a0}000 до 80\u{a0}000 RUR (до вычета НДФЛ)");
        let to_only = Salary { from: None, to: Some(50000), currency: None, gross: false };
        assert_eq!(salary_line(&to_only), "Зарплата: до 50\u{a0}000 (на руки)");
    }

    #[test]
    fn test_html_to_text() {
        let html = "<p><strong>Обязанности:</strong></p><ul><li>доставка &amp; выдача</li><li>касса</li></ul>";
        assert_eq!(html_to_text(html), "Обязанности:\nдоставка & выдача\nкасса");
    }

    #[test]
    fn test_format_description_full() {
        let vacancy = Vacancy {
            name: "Курьер".into(),
            employer: named("Самокат"),
            salary: Some(Salary { from: Some(80000), to: None, currency: Some("RUR".into()), gross: false }),
            experience: named("Нет опыта"),
            employment: named("Полная занятость"),
            schedule: named("Сменный график"),
            area: named("Москва"),
            key_skills: vec![Named { name: "Вежливость".into() }, Named { name: "Пунктуальность".into() }],
            description: Some("<p>Доставка заказов</p>".into()),
        };
        assert_eq!(
            format_description(&vacancy),
            "Профессия: Курьер\nКомпания: Самокат\nЗарплата: от 80\u{a0}000 RUR (на руки)\nОпыт: Нет опыта\n\
             Занятость: Полная занятость\nГрафик: Сменный график\nГород: Москва\n\
             Навыки: Вежливость, Пунктуальность\n\nОписание:\nДоставка заказов"
        );
    }

    #[test]
    fn test_format_description_minimal() {
        let vacancy = Vacancy { name: "Кассир".into(), employer: named(""), ..Default::default() };
        assert_eq!(format_description(&vacancy), "Профессия: Кассир");
    }

    #[test]
    fn test_payload_parses_hh_shape() {
        let raw = r#"{"id":"1","name":"Бариста","employer":{"id":"5","name":"Кофейня"},
            "salary":{"from":null,"to":70000,"currency":"RUR","gross":true},
            "area":{"name":"Казань"},"key_skills":[],"description":"<p>Кофе</p>"}"#;
        let vacancy: Vacancy = serde_json::from_str(raw).unwrap();
        assert_eq!(vacancy.salary.as_ref().unwrap().to, Some(70000));
        assert!(vacancy.experience.is_none());
        assert!(format_description(&vacancy).contains("Город: Казань"));
    }
}
