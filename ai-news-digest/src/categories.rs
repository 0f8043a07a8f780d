use crate::types::Category;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub en: String,
    pub zh: String,
    pub color: String,
}

impl CategoryEntry {
    pub fn new(en: &str, zh: &str, color: &str) -> Self {
        Self {
            en: en.to_string(),
            zh: zh.to_string(),
            color: color.to_string(),
        }
    }

    /// Catch-all bucket for unknown or missing categories.
    pub fn general() -> Self {
        Self::new("General", "综合", "#6B7280")
    }

    pub fn default_palette() -> Vec<Self> {
        vec![
            Self::new("Global Governance", "全球治理", "#0066FF"),
            Self::new("Investment", "投资", "#F59E0B"),
            Self::new("AI Safety", "AI安全", "#10B981"),
            Self::new("Industry Views", "行业观点", "#06B6D4"),
            Self::new("Security Breach", "安全事件", "#EF4444"),
            Self::new("AI Ethics", "AI伦理", "#8B5CF6"),
            Self::new("AI Agents", "AI智能体", "#F97316"),
            Self::new("Policy & Regulation", "政策监管", "#3B82F6"),
            Self::new("Product Launch", "产品发布", "#22C55E"),
            Self::new("Research", "研究", "#A855F7"),
            Self::new("Business", "商业", "#EC4899"),
            Self::new("Technology", "技术", "#14B8A6"),
        ]
    }

    fn to_category(&self) -> Category {
        Category {
            en: self.en.clone(),
            zh: self.zh.clone(),
            color: self.color.clone(),
        }
    }
}

/// Fixed category palette. Model output only picks a name; both labels and
/// the color always come from here.
#[derive(Debug, Clone)]
pub struct CategoryPalette {
    entries: Vec<CategoryEntry>,
    default: CategoryEntry,
}

impl CategoryPalette {
    pub fn new(entries: Vec<CategoryEntry>, default: CategoryEntry) -> Self {
        Self { entries, default }
    }

    /// Maps a model-chosen English (or Chinese) name onto the palette.
    pub fn resolve(&self, en: Option<&str>, zh: Option<&str>) -> Category {
        let en = en.map(str::trim).filter(|s| !s.is_empty());
        let zh = zh.map(str::trim).filter(|s| !s.is_empty());

        self.entries
            .iter()
            .find(|entry| en.is_some_and(|name| entry.en.eq_ignore_ascii_case(name)))
            .or_else(|| self.entries.iter().find(|entry| zh.is_some_and(|name| entry.zh == name)))
            .unwrap_or(&self.default)
            .to_category()
    }

    pub fn default_category(&self) -> Category {
        self.default.to_category()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.en.as_str()).collect()
    }
}

impl Default for CategoryPalette {
    fn default() -> Self {
        Self::new(CategoryEntry::default_palette(), CategoryEntry::general())
    }
}
