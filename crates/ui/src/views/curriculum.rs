use dioxus::prelude::*;

use crate::views::shell::{SaveBadge, Shell};
use crate::vm::{CurriculumVm, DayVm, LevelVm};

#[component]
pub fn CurriculumView(vm: CurriculumVm) -> Element {
    let slug = vm.category.slug();

    rsx! {
        Shell { title: vm.title.to_string(), is_admin: vm.is_admin,
            div { class: "page curriculum", "data-category": "{slug}",
                header { class: "curriculum-header",
                    p { "Cohort: {vm.cohort}" }
                    p { class: "percent", "Progress: {vm.percent}%" }
                    SaveBadge { saved: vm.saved }
                    div { class: "actions",
                        button { "data-action": "save", "Save progress" }
                        button { "data-action": "complete", "Mark page complete" }
                        button { "data-action": "export-json", "Export JSON" }
                        button { "data-action": "export-csv", "Export CSV" }
                    }
                }
                PerformancePanel {
                    completed: vm.completed,
                    remaining: vm.remaining,
                    total: vm.total,
                    avg_difficulty: vm.avg_difficulty.clone(),
                    levels: vm.levels.clone(),
                }
                ol { class: "days",
                    for day in vm.days.iter().cloned() {
                        DayCard { key: "{day.index}", day }
                    }
                }
                p { class: "muted", "Last updated: {vm.last_updated_str}" }
            }
        }
    }
}

#[component]
fn PerformancePanel(
    completed: usize,
    remaining: usize,
    total: usize,
    avg_difficulty: String,
    levels: Vec<LevelVm>,
) -> Element {
    rsx! {
        section { class: "performance",
            h3 { "Performance" }
            dl {
                dt { "Completed" }
                dd { "{completed}/{total}" }
                dt { "Remaining" }
                dd { "{remaining}" }
                dt { "Average difficulty" }
                dd { "{avg_difficulty}" }
            }
            ul { class: "levels",
                for level in levels {
                    li { key: "{level.label}", "{level.label}: {level.completed}/{level.total}" }
                }
            }
        }
    }
}

#[component]
fn DayCard(day: DayVm) -> Element {
    let status = if day.completed { "done" } else { "pending" };

    rsx! {
        li { class: "day {status}",
            label {
                input {
                    r#type: "checkbox",
                    checked: day.completed,
                    "data-day": "{day.index}",
                }
                span { class: "day-title", "Day {day.day}: {day.title}" }
            }
            span { class: "duration", "{day.duration}" }
            span { class: "difficulty", "Difficulty {day.difficulty}" }
            textarea { class: "note", "data-note": "{day.index}", placeholder: "Notes", "{day.note}" }
        }
    }
}
