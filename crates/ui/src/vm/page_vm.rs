use crate::routes::Page;
use crate::vm::{AdminVm, CurriculumVm, DashboardVm};

/// Everything a page component needs, resolved before rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageModel {
    Loading,
    Landing { signed_in: bool },
    Login { error: Option<String>, notice: Option<String> },
    Dashboard(DashboardVm),
    Curriculum(CurriculumVm),
    Admin(AdminVm),
    NotFound { path: String },
    Error { message: String },
}

impl PageModel {
    /// Page this model renders, if it is a routable page.
    #[must_use]
    pub fn page(&self) -> Option<Page> {
        match self {
            PageModel::Landing { .. } => Some(Page::Landing),
            PageModel::Login { .. } => Some(Page::Login),
            PageModel::Dashboard(_) => Some(Page::Dashboard),
            PageModel::Curriculum(vm) => Some(Page::Curriculum(vm.category)),
            PageModel::Admin(_) => Some(Page::Admin),
            PageModel::NotFound { .. } => Some(Page::NotFound),
            PageModel::Loading | PageModel::Error { .. } => None,
        }
    }
}
