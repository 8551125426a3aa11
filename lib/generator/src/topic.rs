//! Keyword-based topic detection for template selection.

use std::fmt;

/// Integration family a template is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    LeadCrm,
    Notification,
    DataSync,
    HttpFetch,
}

/// Topic library in tie-break order, with the stems each topic scores on.
const LIBRARY: &[(Topic, &[&str])] = &[
    (
        Topic::LeadCrm,
        &[
            "lead", "crm", "hubspot", "salesforce", "contact", "customer", "prospect", "deal",
            "signup",
        ],
    ),
    (
        Topic::Notification,
        &[
            "slack", "notif", "alert", "message", "chat", "discord", "summar", "remind",
        ],
    ),
    (
        Topic::DataSync,
        &[
            "sync", "sheet", "spreadsheet", "database", "postgres", "backup", "import", "export",
            "csv", "replicat",
        ],
    ),
    (
        Topic::HttpFetch,
        &["fetch", "api", "http", "scrap", "download", "poll", "endpoint", "json"],
    ),
];

impl Topic {
    /// Picks the topic whose stems match the most hint words.
    ///
    /// Ties go to the topic listed first; no matches at all yields
    /// [`Topic::HttpFetch`].
    #[must_use]
    pub fn detect<S: AsRef<str>>(hints: &[S]) -> Self {
        let mut best = (Self::HttpFetch, 0usize);
        for (topic, stems) in LIBRARY {
            let score = hints
                .iter()
                .filter(|word| {
                    let word = word.as_ref();
                    stems.iter().any(|stem| word.starts_with(stem))
                })
                .count();
            if score > best.1 {
                best = (*topic, score);
            }
        }
        best.0
    }

    /// Short tag stored on generated workflows.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::LeadCrm => "crm",
            Self::Notification => "notification",
            Self::DataSync => "data-sync",
            Self::HttpFetch => "http",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::LeadCrm => "Lead capture",
            Self::Notification => "Notification",
            Self::DataSync => "Data sync",
            Self::HttpFetch => "API fetch",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    #[test]
    fn detects_each_topic() {
        assert_eq!(Topic::detect(&words("add new leads to hubspot")), Topic::LeadCrm);
        assert_eq!(Topic::detect(&words("send a daily slack summary")), Topic::Notification);
        assert_eq!(Topic::detect(&words("sync orders into a spreadsheet")), Topic::DataSync);
        assert_eq!(Topic::detect(&words("fetch the api every hour")), Topic::HttpFetch);
    }

    #[test]
    fn stems_match_inflections() {
        assert_eq!(Topic::detect(&words("notifications for failures")), Topic::Notification);
        assert_eq!(Topic::detect(&words("summarize yesterday")), Topic::Notification);
    }

    #[test]
    fn ties_resolve_in_library_order() {
        // One CRM hit, one notification hit.
        assert_eq!(Topic::detect(&words("slack the lead")), Topic::LeadCrm);
    }

    #[test]
    fn no_hits_default_to_http_fetch() {
        assert_eq!(Topic::detect(&words("do something nice")), Topic::HttpFetch);
        assert_eq!(Topic::detect::<String>(&[]), Topic::HttpFetch);
    }
}
