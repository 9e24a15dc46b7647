use dioxus::prelude::*;

#[component]
pub fn LoginView(error: Option<String>, notice: Option<String>) -> Element {
    rsx! {
        div { class: "page login",
            h2 { "Sign in" }
            match error {
                Some(message) => rsx! { p { class: "auth-error", "{message}" } },
                None => rsx! {},
            }
            match notice {
                Some(message) => rsx! { p { class: "auth-notice", "{message}" } },
                None => rsx! {},
            }
            form { class: "login-form",
                input { r#type: "email", name: "email", placeholder: "Email" }
                input { r#type: "password", name: "password", placeholder: "Password" }
                button { r#type: "submit", "data-action": "sign-in", "Sign in" }
                button { r#type: "button", "data-action": "sign-up", "Create account" }
            }
            button { class: "google", "data-action": "google", "Continue with Google" }
        }
    }
}
