use hub_core::model::{Category, OverallStats, ProgressRecord, User, UserId};
use services::{InternOverview, SaveIndicator};

use super::render_page;
use crate::vm::{PageModel, map_admin, map_curriculum, map_dashboard};

fn intern() -> User {
    User::new(UserId::new("u1"), "ada@example.com").with_full_name("Ada Lovelace")
}

#[test]
fn loading_and_error_screens_render() {
    let html = render_page(&PageModel::Loading);
    assert!(html.contains("Loading"), "missing placeholder in {html}");

    let html = render_page(&PageModel::Error {
        message: "backend unreachable".into(),
    });
    assert!(html.contains("Something went wrong"), "missing title in {html}");
    assert!(html.contains("backend unreachable"), "missing message in {html}");
}

#[test]
fn login_view_shows_inline_error() {
    let html = render_page(&PageModel::Login {
        error: Some("Invalid login credentials".into()),
        notice: None,
    });
    assert!(html.contains("Invalid login credentials"), "missing error in {html}");
    assert!(html.contains("Continue with Google"), "missing google button in {html}");
}

#[test]
fn dashboard_view_lists_categories() {
    let mut n8n = ProgressRecord::new(Category::N8n);
    n8n.set_day(0, true).unwrap();
    let vm = map_dashboard(&intern(), &[n8n], SaveIndicator::Saved);

    let html = render_page(&PageModel::Dashboard(vm));
    assert!(html.contains("Welcome, Ada Lovelace"), "missing greeting in {html}");
    assert!(html.contains("#/vibe-coding"), "missing card link in {html}");
    assert!(html.contains("11%"), "missing percent in {html}");
    assert!(html.contains("Saved"), "missing save indicator in {html}");
    assert!(!html.contains("#/admin"), "intern sees admin link in {html}");
}

#[test]
fn curriculum_view_renders_days_and_notes() {
    let mut record = ProgressRecord::new(Category::N8n);
    record.set_day(2, true).unwrap();
    record.set_day(5, true).unwrap();
    record.set_note(5, "built the webhook flow").unwrap();

    let html = render_page(&PageModel::Curriculum(map_curriculum(
        &record,
        SaveIndicator::Idle,
        false,
    )));
    assert!(html.contains("Progress: 22%"), "missing percent in {html}");
    assert!(html.contains("built the webhook flow"), "missing note in {html}");
    assert!(html.contains("Day 9"), "missing last day in {html}");
    assert!(!html.contains("save-indicator"), "unexpected indicator in {html}");
}

#[test]
fn admin_view_links_resumes() {
    let mut user = intern();
    user.resume_url = Some("https://files.example.com/resumes/u1/resume.pdf".into());
    let overview = InternOverview {
        user,
        categories: Category::ALL.iter().map(|c| (*c, 40)).collect(),
        overall: OverallStats {
            completed: 8,
            total: 21,
            percent: 38,
        },
        last_updated: None,
    };

    let html = render_page(&PageModel::Admin(map_admin(&[overview])));
    assert!(html.contains("ada@example.com"), "missing email in {html}");
    assert!(html.contains("38%"), "missing overall in {html}");
    assert!(
        html.contains("https://files.example.com/resumes/u1/resume.pdf"),
        "missing resume link in {html}"
    );
}

#[test]
fn not_found_names_the_path() {
    let html = render_page(&PageModel::NotFound {
        path: "/nowhere".into(),
    });
    assert!(html.contains("/nowhere"), "missing path in {html}");
}
