use crate::catalog::{LinkType, Work, WorkLink};

/// Provenance tag prefix: `nyt:{list_name_encoded}={published_date}`.
pub const TAG_PREFIX: &str = "nyt:";
/// Literal marker tag added alongside the provenance tag.
pub const MARKER_TAG: &str = "New York Times bestseller";
pub const REVIEW_LINK_TITLE: &str = "New York Times review";
pub const LINK_TYPE_KEY: &str = "/type/link";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMerge {
    Added,
    AlreadyTagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMerge {
    Added,
    AlreadyPresent,
    /// An existing `http://` link was rewritten to the `https://` candidate.
    Upgraded,
}

/// Appends the provenance tag and the marker tag unless the work already
/// carries a subject starting with either recognized prefix.
pub fn merge_bestseller_tags(
    work: &mut Work,
    list_name_encoded: &str,
    published_date: &str,
) -> TagMerge {
    let subjects = work.subjects.get_or_insert_with(Vec::new);
    if subjects
        .iter()
        .any(|subject| subject.starts_with(TAG_PREFIX) || subject.starts_with(MARKER_TAG))
    {
        return TagMerge::AlreadyTagged;
    }

    subjects.push(format!("{TAG_PREFIX}{list_name_encoded}={published_date}"));
    subjects.push(MARKER_TAG.to_owned());
    TagMerge::Added
}

/// Merges a review URL into the work's links without duplicating: an exact
/// match is a no-op, the `http://` spelling of an `https://` candidate is
/// upgraded in place, anything else is appended.
pub fn merge_review_link(work: &mut Work, candidate_url: &str) -> LinkMerge {
    let links = work.links.get_or_insert_with(Vec::new);

    if links.iter().any(|link| link.url == candidate_url) {
        return LinkMerge::AlreadyPresent;
    }

    if let Some(http_variant) = http_variant_of(candidate_url)
        && let Some(link) = links.iter_mut().find(|link| link.url == http_variant)
    {
        link.url = candidate_url.to_owned();
        return LinkMerge::Upgraded;
    }

    links.push(WorkLink {
        url: candidate_url.to_owned(),
        title: REVIEW_LINK_TITLE.to_owned(),
        kind: LinkType {
            key: LINK_TYPE_KEY.to_owned(),
        },
    });
    LinkMerge::Added
}

fn http_variant_of(url: &str) -> Option<String> {
    url.strip_prefix("https://")
        .map(|rest| format!("http://{rest}"))
}
