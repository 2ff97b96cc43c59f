//! Request and response payloads of the YuiHub service.

use serde::{Deserialize, Serialize};

/// `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub ok: bool,
    pub environment: Option<String>,
    pub version: Option<String>,
    /// Any additional fields the service reports.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Health {
    /// One-line summary, e.g. `OK version=1.2.0 env=dev`.
    pub fn summary(&self) -> String {
        if !self.ok {
            return "Not OK".to_string();
        }
        format!(
            "OK version={} env={}",
            self.version.as_deref().unwrap_or("n/a"),
            self.environment.as_deref().unwrap_or("n/a")
        )
    }
}

/// One result of `GET /search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub thread: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub score: Option<f64>,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl SearchHit {
    /// Short label: the title, else the first 60 characters of the
    /// snippet, else the id.
    pub fn label(&self) -> String {
        if let Some(title) = non_empty(&self.title) {
            return title.to_string();
        }
        if let Some(snippet) = non_empty(&self.snippet) {
            return snippet.chars().take(60).collect();
        }
        self.id.clone()
    }

    /// Thread and score, e.g. `th-42  score:0.87`.
    pub fn description(&self) -> String {
        let score = self.score.map(|s| format!("{:.2}", s)).unwrap_or_default();
        format!("{}  score:{}", self.thread.as_deref().unwrap_or_default(), score)
            .trim()
            .to_string()
    }

    /// Text block for pasting a hit into a document.
    pub fn insertion_text(&self) -> String {
        format!(
            "// YuiHub Search Hit\n// id: {}\n// thread: {}\n// path: {}\n{}",
            self.id,
            self.thread.as_deref().unwrap_or_default(),
            self.path.as_deref().unwrap_or_default(),
            self.snippet.as_deref().unwrap_or_default()
        )
    }
}

/// `GET /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub ok: bool,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

impl SearchResponse {
    /// Whether there is anything to show.
    pub fn has_hits(&self) -> bool {
        self.ok && !self.hits.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadData {
    pub thread: String,
}

/// `POST /threads/new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub ok: bool,
    pub data: Option<ThreadData>,
}

/// Body of `POST /save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRequest {
    pub source: String,
    pub thread: String,
    pub author: String,
    pub text: String,
}

/// The note created by `POST /save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNote {
    pub id: String,
    pub thread: String,
    pub when: String,
}

/// `POST /save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub ok: bool,
    pub data: Option<SavedNote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_summary() {
        let health: Health =
            serde_json::from_str(r#"{"ok":true,"version":"1.2.0","uptime":42}"#).unwrap();
        assert_eq!(health.summary(), "OK version=1.2.0 env=n/a");
        assert_eq!(health.extra["uptime"], 42);

        let health: Health = serde_json::from_str(r#"{"ok":false}"#).unwrap();
        assert_eq!(health.summary(), "Not OK");
    }

    #[test]
    fn test_hit_label_fallbacks() {
        let mut hit = SearchHit {
            id: "n-1".into(),
            title: Some("Design decision".into()),
            snippet: Some("x".repeat(100)),
            ..SearchHit::default()
        };
        assert_eq!(hit.label(), "Design decision");

        hit.title = Some(String::new());
        assert_eq!(hit.label(), "x".repeat(60));

        hit.snippet = None;
        assert_eq!(hit.label(), "n-1");
    }

    #[test]
    fn test_hit_description_and_insertion() {
        let hit = SearchHit {
            id: "n-1".into(),
            thread: Some("th-42".into()),
            path: Some("notes/a.md".into()),
            snippet: Some("chose sqlite".into()),
            score: Some(0.8731),
            ..SearchHit::default()
        };
        assert_eq!(hit.description(), "th-42  score:0.87");
        assert_eq!(
            hit.insertion_text(),
            "// YuiHub Search Hit\n// id: n-1\n// thread: th-42\n// path: notes/a.md\nchose sqlite"
        );

        let bare = SearchHit {
            id: "n-2".into(),
            ..SearchHit::default()
        };
        assert_eq!(bare.description(), "score:");
    }

    #[test]
    fn test_search_response_defaults() {
        let response: SearchResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert_eq!(response.total, 0);
        assert!(!response.has_hits());
    }
}
