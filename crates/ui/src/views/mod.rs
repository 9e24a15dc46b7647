mod admin;
mod curriculum;
mod dashboard;
mod landing;
mod login;
mod shell;
mod state;
mod status;

use dioxus::prelude::*;
use hub_core::model::{Category, User};

use crate::context::AppContext;
use crate::routes::Page;
use crate::vm::{PageModel, map_admin, map_curriculum, map_dashboard};

pub use admin::AdminView;
pub use curriculum::CurriculumView;
pub use dashboard::DashboardView;
pub use landing::LandingView;
pub use login::LoginView;
pub use state::ViewError;
pub use status::{ErrorView, LoadingView, NotFoundView};

/// Single dispatch point from page models to page components.
#[component]
pub fn PageView(model: PageModel) -> Element {
    match model {
        PageModel::Loading => rsx! { LoadingView {} },
        PageModel::Landing { signed_in } => rsx! { LandingView { signed_in } },
        PageModel::Login { error, notice } => rsx! { LoginView { error, notice } },
        PageModel::Dashboard(vm) => rsx! { DashboardView { vm } },
        PageModel::Curriculum(vm) => rsx! { CurriculumView { vm } },
        PageModel::Admin(vm) => rsx! { AdminView { vm } },
        PageModel::NotFound { path } => rsx! { NotFoundView { path } },
        PageModel::Error { message } => rsx! { ErrorView { message } },
    }
}

/// Render a page model to an HTML string.
#[must_use]
pub fn render_page(model: &PageModel) -> String {
    let mut dom = VirtualDom::new_with_props(
        PageView,
        PageViewProps {
            model: model.clone(),
        },
    );
    dom.rebuild_in_place();
    dioxus_ssr::render(&dom)
}

/// Gather what `page` shows for `user`, loading progress lazily.
///
/// # Errors
///
/// Returns `ViewError` if a signed-in page has no user or its data cannot
/// be loaded.
pub async fn load_page_model(
    ctx: &AppContext,
    page: Page,
    path: &str,
    user: Option<&User>,
) -> Result<PageModel, ViewError> {
    let indicator = ctx.autosave().indicator();
    let model = match page {
        Page::Landing => PageModel::Landing {
            signed_in: user.is_some(),
        },
        Page::Login => PageModel::Login {
            error: None,
            notice: None,
        },
        Page::Dashboard => {
            let user = user.ok_or(ViewError::NotSignedIn)?;
            let progress = ctx.progress();
            for category in Category::ALL {
                progress.ensure_loaded(category).await?;
            }
            let records = ctx.state().all_progress();
            PageModel::Dashboard(map_dashboard(user, &records, indicator))
        }
        Page::Curriculum(category) => {
            let user = user.ok_or(ViewError::NotSignedIn)?;
            let record = ctx.progress().ensure_loaded(category).await?;
            PageModel::Curriculum(map_curriculum(&record, indicator, user.is_admin()))
        }
        Page::Admin => {
            let user = user.ok_or(ViewError::NotSignedIn)?;
            let interns = ctx.admin().list_interns(user).await?;
            PageModel::Admin(map_admin(&interns))
        }
        Page::NotFound => PageModel::NotFound {
            path: path.to_string(),
        },
    };
    Ok(model)
}

#[cfg(test)]
mod view_smoke;
