use super::category::Category;

/// One day of a curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySpec {
    pub day: u8,
    pub title: &'static str,
    pub duration: &'static str,
    /// 1 (intro) to 3 (advanced).
    pub difficulty: u8,
}

/// Static course content for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Curriculum {
    pub category: Category,
    pub title: &'static str,
    pub cohort: &'static str,
    pub days: &'static [DaySpec],
}

impl Curriculum {
    #[must_use]
    pub fn for_category(category: Category) -> &'static Curriculum {
        match category {
            Category::N8n => &N8N,
            Category::VibeCoding => &VIBE_CODING,
            Category::PromptEngineering => &PROMPT_ENGINEERING,
            Category::AiTools => &AI_TOOLS,
        }
    }

    #[must_use]
    pub fn total_days(&self) -> usize {
        self.days.len()
    }
}

const fn day(day: u8, title: &'static str, duration: &'static str, difficulty: u8) -> DaySpec {
    DaySpec {
        day,
        title,
        duration,
        difficulty,
    }
}

static N8N: Curriculum = Curriculum {
    category: Category::N8n,
    title: "N8N Bootcamp Hub",
    cohort: "2024 Automation Engineers",
    days: &[
        day(1, "N8N Basics & Setup", "2 hours", 1),
        day(2, "Data Flow & Nodes", "3 hours", 1),
        day(3, "Triggers & Event Management", "4 hours", 2),
        day(4, "HTTP Integration", "3 hours", 2),
        day(5, "Data Transformation", "3 hours", 2),
        day(6, "Database Operations", "4 hours", 2),
        day(7, "Invoice Automation", "4 hours", 3),
        day(8, "Report Generation", "4 hours", 3),
        day(9, "Capstone Project", "6 hours", 3),
    ],
};

static VIBE_CODING: Curriculum = Curriculum {
    category: Category::VibeCoding,
    title: "Vibe Coding Bootcamp",
    cohort: "2024 Creative Coders",
    days: &[
        day(1, "Introduction to Vibe Coding", "2 hours", 1),
        day(2, "Aesthetics & Code", "3 hours", 1),
        day(3, "Generative Art & Creative APIs", "4 hours", 2),
        day(4, "Sound & Interaction", "4 hours", 2),
        day(5, "Showcase: Personal Project", "5 hours", 3),
    ],
};

static PROMPT_ENGINEERING: Curriculum = Curriculum {
    category: Category::PromptEngineering,
    title: "Prompt Engineering Masters",
    cohort: "2024 Prompt Engineers",
    days: &[
        day(1, "Foundations of Prompting", "2 hours", 1),
        day(2, "Core Techniques", "3 hours", 2),
        day(3, "Advanced Prompting: Reasoning & Logic", "4 hours", 3),
        day(4, "Building Prompt Chains & Agents", "4 hours", 3),
        day(5, "Project: Automated Content Creator", "5 hours", 3),
    ],
};

static AI_TOOLS: Curriculum = Curriculum {
    category: Category::AiTools,
    title: "AI Development Tools",
    cohort: "2024 AI Builders",
    days: &[
        day(1, "VS Code & Copilot", "2 hours", 1),
        day(2, "Cursor & Agents", "3 hours", 2),
    ],
};
