use dioxus::prelude::*;

#[component]
pub fn LandingView(signed_in: bool) -> Element {
    rsx! {
        div { class: "page landing",
            h1 { "Bootcamp Hub" }
            p { "Track your bootcamp days, keep notes and export your progress." }
            if signed_in {
                a { class: "cta", href: "#/dashboard", "Go to dashboard" }
            } else {
                a { class: "cta", href: "#/login", "Sign in" }
            }
        }
    }
}
