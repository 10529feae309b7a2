//! System prompt assembly
//!
//! The prompt is rebuilt for every chat request from the profile facts and
//! the current project list, and never exceeds `MAX_CONTEXT_CHARS`.

use crate::projects::models::ProjectRecord;

pub const MAX_CONTEXT_CHARS: usize = 16_000;
pub const MAX_SUMMARY_CHARS: usize = 800;

/// Static facts about the portfolio owner.
#[derive(Debug, Clone)]
pub struct ProfileFacts {
    pub name: String,
    pub email: Option<String>,
    pub stack: String,
    pub routes: Vec<String>,
}

pub fn build_system_prompt(profile: &ProfileFacts, projects: &[ProjectRecord]) -> String {
    let header = format!(
        "You are {name}'s portfolio assistant. Speak in first person as {name}.\n\
         Be polite, helpful, and concise but willing to elaborate when asked. \
         Use Markdown for structure and turn URLs and emails into clickable links.\n\
         If you are not sure, say so and ask a clarifying question.\n\n\
         == Portfolio Summary ==\n\
         Name: {name}\n\
         Email: {email}\n\n\
         == Tech Stack ==\n{stack}\n\n\
         == API Routes ==\n{routes}\n\n\
         == Projects ==\n",
        name = profile.name,
        email = profile.email.as_deref().unwrap_or("N/A"),
        stack = profile.stack,
        routes = if profile.routes.is_empty() {
            "N/A".to_string()
        } else {
            profile.routes.join("\n")
        },
    );

    let footer = "\nGuidelines:\n\
        - Always ground answers in the above context.\n\
        - Offer links when relevant (GitHub, Live Demo, Email).\n\
        - When asked about skills, summarize the tech stack and highlight notable projects.\n\
        - When asked to get in touch, provide the email as a mailto link if available.\n";

    let budget = MAX_CONTEXT_CHARS
        .saturating_sub(char_len(&header))
        .saturating_sub(char_len(footer));

    let mut body = String::new();
    let mut used = 0;
    for (idx, project) in projects.iter().enumerate() {
        let entry = project_entry(idx + 1, project);
        let len = char_len(&entry);
        if used + len > budget {
            let note = format!("({} more projects omitted)\n", projects.len() - idx);
            if used + char_len(&note) <= budget {
                body.push_str(&note);
            }
            break;
        }
        used += len;
        body.push_str(&entry);
    }
    if projects.is_empty() {
        body.push_str("No projects found yet.\n");
    }

    let prompt = format!("{header}{body}{footer}");
    truncate_chars(&prompt, MAX_CONTEXT_CHARS)
}

fn project_entry(number: usize, project: &ProjectRecord) -> String {
    format!(
        "{number}. {title}\n   - Tech: {tech}\n   - GitHub: {github}\n   - Live: {live}\n   - Summary: {summary}\n",
        title = project.title,
        tech = project.technologies.join(", "),
        github = project.github_url.as_deref().unwrap_or("-"),
        live = project.live_demo_url.as_deref().unwrap_or("-"),
        summary = summarize(&project.description, MAX_SUMMARY_CHARS),
    )
}

/// First `max` chars, with an ellipsis when something was cut.
pub fn summarize(text: &str, max: usize) -> String {
    if char_len(text) <= max {
        return text.to_string();
    }
    let mut cut = truncate_chars(text, max);
    cut.push('…');
    cut
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::models::OwnerInfo;
    use chrono::Utc;

    fn profile() -> ProfileFacts {
        ProfileFacts {
            name: "Sam".to_string(),
            email: Some("sam@example.com".to_string()),
            stack: "Rust + axum + SQLite".to_string(),
            routes: vec!["GET /api/v1/projects".to_string()],
        }
    }

    fn project(title: &str, description: String) -> ProjectRecord {
        ProjectRecord {
            id: title.to_string(),
            title: title.to_string(),
            description,
            technologies: vec!["Rust".to_string(), "SQL".to_string()],
            github_url: Some("https://github.com/sam/x".to_string()),
            live_demo_url: None,
            image: None,
            owner: OwnerInfo {
                id: "u1".to_string(),
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_truncation() {
        assert_eq!(summarize("short", 800), "short");

        let long = "é".repeat(900);
        let summary = summarize(&long, 800);
        assert_eq!(summary.chars().count(), 801);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn test_prompt_lists_projects() {
        let prompt = build_system_prompt(&profile(), &[project("Compiler", "A toy compiler".to_string())]);

        assert!(prompt.contains("Speak in first person as Sam"));
        assert!(prompt.contains("1. Compiler"));
        assert!(prompt.contains("Tech: Rust, SQL"));
        assert!(prompt.contains("Live: -"));
        assert!(prompt.contains("GET /api/v1/projects"));
    }

    #[test]
    fn test_prompt_without_projects() {
        let prompt = build_system_prompt(&profile(), &[]);
        assert!(prompt.contains("No projects found yet."));
    }

    #[test]
    fn test_prompt_is_bounded() {
        let projects: Vec<_> = (0..100)
            .map(|i| project(&format!("Project {i}"), "word ".repeat(400)))
            .collect();
        let prompt = build_system_prompt(&profile(), &projects);

        assert!(prompt.chars().count() <= MAX_CONTEXT_CHARS);
        assert!(prompt.contains("more projects omitted"));
        assert!(prompt.contains("Guidelines:"));
    }
}
