use super::intent::command_file_limit;
use super::{ModeAnswer, QueryEngine};
use crate::models::RepoRef;

pub(super) async fn answer(engine: &QueryEngine, repo: &RepoRef, query: &str) -> ModeAnswer {
    let files = match engine.source.list_files(&repo.url, false).await {
        Ok(files) => files,
        Err(e) => {
            tracing::error!("Listing files for {} failed: {e:#}", repo.name);
            return ModeAnswer::text(format!(
                "I could not list the files of {} right now. Please try again later.",
                repo.name
            ));
        }
    };

    let total = files.len();
    if total == 0 {
        return ModeAnswer::text(format!("{} has no files.", repo.name));
    }

    let shown = command_file_limit(query).map_or(total, |n| n.min(total));
    let listing: Vec<String> = files
        .iter()
        .take(shown)
        .map(|f| format!("- {}", f.path))
        .collect();

    ModeAnswer::text(format!(
        "Showing {shown} of {total} files:\n{}",
        listing.join("\n")
    ))
}
