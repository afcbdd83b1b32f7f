//! Classification of interactions into routes
//!
//! Custom ids form an open namespace, so buttons and modals are matched
//! against ordered tables: exact ids first, then the longest matching prefix.
//! `court_vote_support_42` therefore never reaches the `support_` handler.

use crate::interaction::InteractionKind;

/// Downstream handler selected for a button or modal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    OpenForm,
    OpenReviewForm,
    ProposalVote,
    CourtSupport,
    CourtVote,
    SelfModeration,
    FormSubmission,
    ReviewSubmission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Slash command, resolved by name in the command registry
    Command(String),
    Target(Target),
    Ignored,
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Exact(&'static str),
    Prefix(&'static str),
}

const BUTTON_ROUTES: &[(Matcher, Target)] = &[
    (Matcher::Exact("open_form"), Target::OpenForm),
    (Matcher::Exact("open_review_form"), Target::OpenReviewForm),
    (Matcher::Prefix("support_"), Target::ProposalVote),
    (Matcher::Prefix("court_support_"), Target::CourtSupport),
    (Matcher::Prefix("court_vote_support_"), Target::CourtVote),
    (Matcher::Prefix("court_vote_oppose_"), Target::CourtVote),
    (Matcher::Prefix("selfmod_"), Target::SelfModeration),
];

const MODAL_ROUTES: &[(Matcher, Target)] = &[
    (Matcher::Exact("form_submission"), Target::FormSubmission),
    (Matcher::Exact("review_submission"), Target::ReviewSubmission),
    (Matcher::Prefix("selfmod_modal_"), Target::SelfModeration),
];

/// Pick the route for an interaction
pub fn classify(kind: InteractionKind, identifier: &str) -> Route {
    let table = match kind {
        InteractionKind::Command => return Route::Command(identifier.to_string()),
        InteractionKind::Button => BUTTON_ROUTES,
        InteractionKind::ModalSubmit => MODAL_ROUTES,
        InteractionKind::Other => return Route::Ignored,
    };

    lookup(table, identifier).map_or(Route::Ignored, Route::Target)
}

fn lookup(table: &[(Matcher, Target)], identifier: &str) -> Option<Target> {
    let exact = table.iter().find_map(|(matcher, target)| match matcher {
        Matcher::Exact(id) if *id == identifier => Some(*target),
        _ => None,
    });

    exact.or_else(|| {
        table
            .iter()
            .filter_map(|(matcher, target)| match matcher {
                Matcher::Prefix(prefix) if identifier.starts_with(prefix) => Some((prefix.len(), *target)),
                _ => None,
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, target)| target)
    })
}
