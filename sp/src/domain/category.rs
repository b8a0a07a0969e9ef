//! Task categories

use serde::{Deserialize, Serialize};

/// Category of a Task
///
/// `academic` is the name the dashboards and the task backend use for study
/// work, so it is accepted as an alias on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "academic")]
    Study,
    Work,
    Personal,
    Extracurricular,
    #[default]
    Other,
}

impl Category {
    /// Categories the fallback schedules rotate through
    pub const ROTATION: [Category; 4] = [Category::Study, Category::Work, Category::Personal, Category::Other];

    /// Categories allowed on a weekend day when the user asked for weekend time
    pub const WEEKEND: [Category; 2] = [Category::Personal, Category::Other];

    /// Parse leniently: unknown or missing values become `Other`
    pub fn from_lenient(s: Option<&str>) -> Self {
        s.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    /// Whether this category is allowed on a user-requested weekend day
    pub fn is_weekend_friendly(&self) -> bool {
        Self::WEEKEND.contains(self)
    }

    /// Capitalized name for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Study => "Study",
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Extracurricular => "Extracurricular",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Study => write!(f, "study"),
            Self::Work => write!(f, "work"),
            Self::Personal => write!(f, "personal"),
            Self::Extracurricular => write!(f, "extracurricular"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "study" | "academic" => Ok(Self::Study),
            "work" => Ok(Self::Work),
            "personal" => Ok(Self::Personal),
            "extracurricular" => Ok(Self::Extracurricular),
            "other" => Ok(Self::Other),
            _ => Err(format!(
                "Unknown category: {}. Use: study, work, personal, extracurricular, or other",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_accepts_academic() {
        assert_eq!("academic".parse::<Category>().unwrap(), Category::Study);
        assert_eq!("Study".parse::<Category>().unwrap(), Category::Study);
        assert!("hobby".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_lenient() {
        assert_eq!(Category::from_lenient(Some("work")), Category::Work);
        assert_eq!(Category::from_lenient(Some("gym")), Category::Other);
        assert_eq!(Category::from_lenient(None), Category::Other);
    }

    #[test]
    fn test_category_serde_alias() {
        let category: Category = serde_json::from_str("\"academic\"").unwrap();
        assert_eq!(category, Category::Study);
        assert_eq!(serde_json::to_string(&Category::Study).unwrap(), "\"study\"");
    }

    #[test]
    fn test_weekend_friendly() {
        assert!(Category::Personal.is_weekend_friendly());
        assert!(Category::Other.is_weekend_friendly());
        assert!(!Category::Study.is_weekend_friendly());
        assert!(!Category::Work.is_weekend_friendly());
    }
}
