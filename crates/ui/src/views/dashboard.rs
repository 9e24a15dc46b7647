use dioxus::prelude::*;

use crate::views::shell::{SaveBadge, Shell};
use crate::vm::{CategoryCardVm, DashboardVm};

#[component]
pub fn DashboardView(vm: DashboardVm) -> Element {
    let title = format!("Welcome, {}", vm.display_name);
    let overall = vm.overall;

    rsx! {
        Shell { title, is_admin: vm.is_admin,
            div { class: "page dashboard",
                p { class: "profile", "{vm.email} · Cohort {vm.cohort}" }
                SaveBadge { saved: vm.saved }
                section { class: "overall",
                    h3 { "Overall progress" }
                    p { "Overall: {overall.percent}%" }
                    p { "{overall.completed} of {overall.total} days complete" }
                }
                section { class: "cards",
                    for card in vm.cards.iter().cloned() {
                        CategoryCard { key: "{card.route}", card }
                    }
                }
                section { class: "resume",
                    h3 { "Resume" }
                    match vm.resume_url.clone() {
                        Some(url) => rsx! { a { href: "{url}", target: "_blank", "View uploaded resume" } },
                        None => rsx! { p { "No resume uploaded yet." } },
                    }
                    input { r#type: "file", "data-action": "upload-resume" }
                }
            }
        }
    }
}

#[component]
fn CategoryCard(card: CategoryCardVm) -> Element {
    rsx! {
        a { class: "category-card", href: "#{card.route}",
            h4 { "{card.title}" }
            div { class: "progress-bar",
                div { class: "progress-fill", style: "width: {card.percent}%" }
            }
            p { "{card.percent}% · {card.completed}/{card.total} days" }
            p { class: "muted", "Last updated: {card.last_updated_str}" }
        }
    }
}
