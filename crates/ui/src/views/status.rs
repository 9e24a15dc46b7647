use dioxus::prelude::*;

#[component]
pub fn LoadingView() -> Element {
    rsx! {
        div { class: "loading", "Loading…" }
    }
}

#[component]
pub fn NotFoundView(path: String) -> Element {
    rsx! {
        div { class: "page not-found",
            h2 { "Page not found" }
            p { "Nothing lives at {path}." }
            a { href: "#/", "Back to start" }
        }
    }
}

/// Generic screen for failures caught while handling a route.
#[component]
pub fn ErrorView(message: String) -> Element {
    rsx! {
        div { class: "error-screen",
            h2 { "Something went wrong" }
            pre { "{message}" }
        }
    }
}
