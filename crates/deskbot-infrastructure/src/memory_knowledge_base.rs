//! In-process knowledge base.
//!
//! Articles are ranked by text similarity to the query against title and
//! summary, with a boost for articles in the query's category. An article
//! file replaces the built-in set:
//!
//! ```toml
//! [[article]]
//! id = "KB0002"
//! title = "VPN Connection Issues"
//! summary = "Troubleshooting guide for VPN connectivity problems"
//! url = "/kb/KB0002"
//! category = "Network"
//! ```

use async_trait::async_trait;
use deskbot_core::error::{DeskbotError, Result};
use deskbot_core::knowledge::{KnowledgeArticle, KnowledgeBase};
use deskbot_core::text;
use deskbot_core::ticket::Category;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Articles scoring below this are not returned.
const MIN_SCORE: f64 = 0.25;
const CATEGORY_BOOST: f64 = 0.15;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArticleFile {
    #[serde(rename = "article", default)]
    articles: Vec<KnowledgeArticle>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeBase {
    articles: Arc<Vec<KnowledgeArticle>>,
}

impl InMemoryKnowledgeBase {
    pub fn new(articles: Vec<KnowledgeArticle>) -> Self {
        Self {
            articles: Arc::new(articles),
        }
    }

    /// Parses an article file.
    ///
    /// # Errors
    ///
    /// `FatalConfiguration` when the file does not parse or an article has
    /// no id or title.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ArticleFile = toml::from_str(content)
            .map_err(|e| DeskbotError::config(format!("invalid knowledge base: {}", e)))?;
        if let Some(bad) = file
            .articles
            .iter()
            .find(|a| a.id.trim().is_empty() || a.title.trim().is_empty())
        {
            return Err(DeskbotError::config(format!(
                "knowledge base: article '{}' needs both an id and a title",
                bad.id
            )));
        }
        Ok(Self::new(file.articles))
    }

    /// The articles shipped with the binary.
    pub fn builtin() -> Self {
        let article = |id: &str, title: &str, summary: &str, category: Category| KnowledgeArticle {
            id: id.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            url: format!("/kb_view.do?sysparm_article={}", id),
            category: Some(category),
        };
        Self::new(vec![
            article(
                "KB0001",
                "How to Reset Password",
                "Step-by-step guide to reset your account password and unlock your login",
                Category::Access,
            ),
            article(
                "KB0002",
                "VPN Connection Issues",
                "Troubleshooting guide for VPN connectivity problems and dropped connections",
                Category::Network,
            ),
            article(
                "KB0003",
                "Software Installation Guide",
                "How to install approved software applications from the company portal",
                Category::Software,
            ),
            article(
                "KB0004",
                "Email Configuration",
                "How to configure Outlook and mobile email clients for corporate mailboxes",
                Category::Email,
            ),
            article(
                "KB0005",
                "Clearing a Printer Paper Jam",
                "How to clear a paper jam and reset the office printer queue",
                Category::Printer,
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    fn score(article: &KnowledgeArticle, query: &str, category: Option<Category>) -> f64 {
        let text_score = text::similarity(query, &article.title).max(text::similarity(query, &article.summary));
        let boost = if category.is_some() && article.category == category {
            CATEGORY_BOOST
        } else {
            0.0
        };
        text_score + boost
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    async fn search(&self, query: &str, category: Option<Category>, limit: usize) -> Result<Vec<KnowledgeArticle>> {
        let mut scored: Vec<(f64, &KnowledgeArticle)> = self
            .articles
            .iter()
            .map(|a| (Self::score(a, query, category), a))
            .filter(|(score, _)| *score >= MIN_SCORE)
            .collect();
        scored.sort_by(|(a, left), (b, right)| b.total_cmp(a).then_with(|| left.id.cmp(&right.id)));

        tracing::debug!(matches = scored.len(), limit, "Knowledge base search");
        Ok(scored.into_iter().take(limit).map(|(_, a)| a.clone()).collect())
    }
}
