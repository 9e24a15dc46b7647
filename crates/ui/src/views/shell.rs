use dioxus::prelude::*;
use hub_core::model::Category;

/// Navigation bar and content frame shared by signed-in pages.
#[component]
pub fn Shell(title: String, is_admin: bool, children: Element) -> Element {
    let links: Vec<(&str, &str, &str)> = Category::ALL
        .iter()
        .map(|c| (c.slug(), c.route_path(), c.short_label()))
        .collect();

    rsx! {
        div { class: "app",
            nav { class: "topbar",
                h1 { "Bootcamp Hub" }
                ul {
                    li { a { href: "#/dashboard", "Dashboard" } }
                    for (slug, route, label) in links {
                        li { key: "{slug}",
                            a { href: "#{route}", "{label}" }
                        }
                    }
                    if is_admin {
                        li { a { href: "#/admin", "Admin" } }
                    }
                    li { button { class: "sign-out", "data-action": "sign-out", "Sign out" } }
                }
            }
            main { class: "content",
                h2 { "{title}" }
                {children}
            }
        }
    }
}

#[component]
pub fn SaveBadge(saved: bool) -> Element {
    rsx! {
        if saved {
            span { class: "save-indicator", "Saved" }
        }
    }
}
