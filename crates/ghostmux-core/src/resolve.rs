use crate::naming::friendly_name;
use crate::Session;

/// Picks the session a user-supplied target refers to. Rules are tried in
/// order and the first rule with any match wins; within a rule the earliest
/// session wins:
///
/// 1. exact id
/// 2. title, ignoring case
/// 3. title substring, ignoring case
/// 4. id prefix
pub fn resolve_target<'a>(target: &str, sessions: &'a [Session]) -> Option<&'a Session> {
    let lower_target = target.to_lowercase();

    sessions
        .iter()
        .find(|session| session.id == target)
        .or_else(|| {
            sessions
                .iter()
                .find(|session| session.title.to_lowercase() == lower_target)
        })
        .or_else(|| {
            sessions
                .iter()
                .find(|session| session.title.to_lowercase().contains(&lower_target))
        })
        .or_else(|| sessions.iter().find(|session| session.id.starts_with(target)))
}

/// Friendly names (`swift-falcon`) take precedence, then the regular rules.
pub fn resolve_with_names<'a>(target: &str, sessions: &'a [Session]) -> Option<&'a Session> {
    let lower_target = target.to_lowercase();
    sessions
        .iter()
        .find(|session| friendly_name(&session.id) == lower_target)
        .or_else(|| resolve_target(target, sessions))
}
