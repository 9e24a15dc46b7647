use dioxus::prelude::*;

use crate::views::shell::Shell;
use crate::vm::{AdminVm, InternRowVm};

#[component]
pub fn AdminView(vm: AdminVm) -> Element {
    let count = vm.rows.len();

    rsx! {
        Shell { title: "Intern overview".to_string(), is_admin: true,
            div { class: "page admin",
                p { "{count} interns" }
                table { class: "interns",
                    thead {
                        tr {
                            th { "Name" }
                            th { "Email" }
                            th { "Cohort" }
                            for column in vm.columns.iter().copied() {
                                th { key: "{column}", "{column}" }
                            }
                            th { "Overall" }
                            th { "Last updated" }
                            th { "Resume" }
                        }
                    }
                    tbody {
                        for row in vm.rows.iter().cloned() {
                            InternRow { key: "{row.email}", row }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn InternRow(row: InternRowVm) -> Element {
    rsx! {
        tr {
            td { "{row.name}" }
            td { "{row.email}" }
            td { "{row.cohort}" }
            for (i, percent) in row.percents.iter().copied().enumerate() {
                td { key: "{i}", "{percent}%" }
            }
            td { "{row.overall_percent}%" }
            td { "{row.last_updated_str}" }
            td {
                match row.resume_url.clone() {
                    Some(url) => rsx! { a { href: "{url}", target: "_blank", "View" } },
                    None => rsx! { span { class: "muted", "None" } },
                }
            }
        }
    }
}
