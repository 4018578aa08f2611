use serde::{Deserialize, Serialize};

const UNTITLED_NOTE: &str = "New Note";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
    pub last_edited: String,
}

impl Note {
    /// First non-empty line of the content, used as a list heading.
    pub fn title(&self) -> &str {
        self.content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or(UNTITLED_NOTE)
    }
}

#[cfg(test)]
mod tests {
    use super::Note;

    fn note(content: &str) -> Note {
        Note {
            id: "note-1".to_string(),
            content: content.to_string(),
            completed: false,
            created_at: "2025-12-20T00:00:00Z".to_string(),
            last_edited: "2025-12-20T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn title_uses_first_non_blank_line() {
        assert_eq!(note("\n  groceries \nmilk").title(), "groceries");
    }

    #[test]
    fn title_falls_back_for_blank_content() {
        assert_eq!(note("   \n").title(), "New Note");
    }
}
