//! Deterministic keyword-based resolver.
//!
//! Covers the common phrasings without any external service:
//!
//! | Phrasing                                   | Intent            |
//! |--------------------------------------------|-------------------|
//! | `create a permission called publish content` | create_permission |
//! | `create role editor`                       | create_role       |
//! | `give editor permission to delete posts`   | assign_permission |
//! | `let editors delete posts`                 | assign_permission |
//! | `assign delete posts to editor`            | assign_permission |
//! | `show all permissions` / `list roles`      | list_*            |
//!
//! Names are returned as typed; normalization is the dispatcher's job.

use async_trait::async_trait;

use super::IntentResolver;
use crate::error::DomainResult;
use crate::intent::{params, IntentKind, ResolvedIntent};

const MATCH_CONFIDENCE: f64 = 0.8;

const CREATE_VERBS: &[&str] = &["create", "add", "make", "new", "define"];
const LIST_VERBS: &[&str] = &["show", "list", "display", "get", "view", "what"];
const ARTICLES: &[&str] = &["a", "an", "the"];
const NAME_MARKERS: &[&str] = &["called", "named"];

/// Resolver matching a fixed set of command phrasings.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordResolver;

impl KeywordResolver {
    pub fn new() -> Self {
        Self
    }

    /// Classifies a command synchronously.
    pub fn classify(&self, text: &str) -> ResolvedIntent {
        let words: Vec<&str> = text
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '_' && c != '-'))
            .filter(|w| !w.is_empty())
            .collect();
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();

        let Some(verb) = lower.first().map(String::as_str) else {
            return ResolvedIntent::unknown();
        };

        if CREATE_VERBS.contains(&verb) {
            return create_intent(&words, &lower);
        }
        if LIST_VERBS.contains(&verb) {
            return list_intent(&lower);
        }
        match verb {
            "give" | "grant" => give_intent(&words, &lower),
            "let" | "allow" => let_intent(&words, &lower),
            "assign" => assign_intent(&words, &lower),
            _ => ResolvedIntent::unknown(),
        }
    }
}

#[async_trait]
impl IntentResolver for KeywordResolver {
    async fn resolve(&self, text: &str) -> DomainResult<ResolvedIntent> {
        Ok(self.classify(text))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

fn is_permission_word(word: &str) -> bool {
    word == "permission" || word == "permissions"
}

fn is_role_word(word: &str) -> bool {
    word == "role" || word == "roles"
}

/// Text after the first `called`/`named` (or `with name`), taken verbatim.
fn marked_name(words: &[&str], lower: &[String]) -> Option<String> {
    let marker = lower.iter().enumerate().position(|(i, w)| {
        NAME_MARKERS.contains(&w.as_str())
            || (w == "name" && i > 0 && lower[i - 1] == "with")
    })?;
    Some(words[marker + 1..].join(" "))
}

/// Index of the first word that is not an article.
fn skip_articles(lower: &[String]) -> usize {
    lower
        .iter()
        .take_while(|w| ARTICLES.contains(&w.as_str()))
        .count()
}

/// A role reference such as `the editor role` or `role editor`.
///
/// Without a name marker, a single leading or trailing `role` word is
/// treated as a descriptor and dropped.
fn role_phrase(words: &[&str], lower: &[String]) -> String {
    if let Some(name) = marked_name(words, lower) {
        return name;
    }
    let mut start = skip_articles(lower);
    let mut end = words.len();
    if start < end && is_role_word(&lower[start]) {
        start += 1;
    }
    if end > start + 1 && is_role_word(&lower[end - 1]) {
        end -= 1;
    }
    words[start..end].join(" ")
}

/// A permission reference such as `the permission read users`.
///
/// Only a leading `permission` descriptor is dropped; trailing entity words
/// belong to the name (`read roles`, `assign permissions`).
fn permission_phrase(words: &[&str], lower: &[String]) -> String {
    if let Some(name) = marked_name(words, lower) {
        return name;
    }
    let mut start = skip_articles(lower);
    if start + 1 < words.len() && is_permission_word(&lower[start]) {
        start += 1;
    }
    words[start..].join(" ")
}

/// The name in `create <entity> ...`: verbatim after a marker, otherwise the
/// remaining words minus leading articles.
fn created_name(words: &[&str], lower: &[String]) -> String {
    marked_name(words, lower).unwrap_or_else(|| words[skip_articles(lower)..].join(" "))
}

fn with_name(kind: IntentKind, key: &str, name: String) -> ResolvedIntent {
    let intent = ResolvedIntent::new(kind, MATCH_CONFIDENCE);
    if name.is_empty() {
        intent
    } else {
        intent.with_parameter(key, name)
    }
}

fn assignment(role_name: String, permission_name: String) -> ResolvedIntent {
    let mut intent = ResolvedIntent::new(IntentKind::AssignPermission, MATCH_CONFIDENCE);
    if !role_name.is_empty() {
        intent = intent.with_parameter(params::ROLE_NAME, role_name);
    }
    if !permission_name.is_empty() {
        intent = intent.with_parameter(params::PERMISSION_NAME, permission_name);
    }
    intent
}

fn create_intent(words: &[&str], lower: &[String]) -> ResolvedIntent {
    let entity = lower
        .iter()
        .position(|w| is_permission_word(w) || is_role_word(w));
    let Some(index) = entity else {
        return ResolvedIntent::unknown();
    };
    let name = created_name(&words[index + 1..], &lower[index + 1..]);
    if is_permission_word(&lower[index]) {
        with_name(IntentKind::CreatePermission, params::NAME, name)
    } else {
        with_name(IntentKind::CreateRole, params::NAME, name)
    }
}

fn list_intent(lower: &[String]) -> ResolvedIntent {
    if lower.iter().any(|w| is_permission_word(w)) {
        ResolvedIntent::new(IntentKind::ListPermissions, MATCH_CONFIDENCE)
    } else if lower.iter().any(|w| is_role_word(w)) {
        ResolvedIntent::new(IntentKind::ListRoles, MATCH_CONFIDENCE)
    } else {
        ResolvedIntent::unknown()
    }
}

/// `give <role> permission to <permission>` or `grant <permission> to <role>`.
fn give_intent(words: &[&str], lower: &[String]) -> ResolvedIntent {
    let permission_to = lower
        .windows(2)
        .position(|pair| is_permission_word(&pair[0]) && pair[1] == "to");
    if let Some(index) = permission_to {
        let role = role_phrase(&words[1..index], &lower[1..index]);
        let permission = permission_phrase(&words[index + 2..], &lower[index + 2..]);
        return assignment(role, permission);
    }
    match lower.iter().rposition(|w| w == "to") {
        Some(index) if index > 1 => {
            let permission = permission_phrase(&words[1..index], &lower[1..index]);
            let role = role_phrase(&words[index + 1..], &lower[index + 1..]);
            assignment(role, permission)
        }
        _ => ResolvedIntent::unknown(),
    }
}

/// `let <roles> <permission...>`
fn let_intent(words: &[&str], lower: &[String]) -> ResolvedIntent {
    let start = if lower.get(1).map(String::as_str) == Some("the") {
        2
    } else {
        1
    };
    if words.len() < start + 2 {
        return ResolvedIntent::unknown();
    }
    let role = singular(words[start]);
    let permission = permission_phrase(&words[start + 1..], &lower[start + 1..]);
    assignment(role, permission)
}

/// `assign <permission> to <role>`
fn assign_intent(words: &[&str], lower: &[String]) -> ResolvedIntent {
    match lower.iter().rposition(|w| w == "to") {
        Some(index) if index > 1 => {
            let permission = permission_phrase(&words[1..index], &lower[1..index]);
            let role = role_phrase(&words[index + 1..], &lower[index + 1..]);
            assignment(role, permission)
        }
        _ => ResolvedIntent::unknown(),
    }
}

/// Strips a plural `s` from a role noun ("editors" to "editor").
fn singular(word: &str) -> String {
    let lower = word.to_lowercase();
    if word.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}
