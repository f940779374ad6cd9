//! Channel sidebar listing: the holders of the channel's `chat-member` role.

use crate::domain::{
    entity::{Entity, EntityKind, SearchField},
    page::{Page, PageQuery},
};

use super::{
    contracts::{PrincipalLookup, RawPageFetcher},
    resolve_page::PageResolver,
};

pub const CHAT_MEMBER_ROLE: &str = "chat-member";

const ROLE_SCAN_LIMIT: usize = 10;
const MEMBER_PAGE_LIMIT: usize = 100;

/// Resolves the first page of people holding `chat-member` in `channel_id`.
/// A channel without that role has no members.
pub async fn list_channel_members<F, L>(
    resolver: &PageResolver<F, L>,
    channel_id: &str,
) -> Page<Entity>
where
    F: RawPageFetcher,
    L: PrincipalLookup,
{
    // Filtered by name on the server; an unfiltered first page can miss the role.
    let role_query =
        PageQuery::new(0, ROLE_SCAN_LIMIT).with_search(SearchField::RoleName, CHAT_MEMBER_ROLE);
    let roles = resolver
        .resolve(EntityKind::Role, role_query, Some(channel_id))
        .await;
    if let Some(error) = roles.error {
        return Page::failed(0, error);
    }

    let role_id = roles.items.iter().find_map(|entity| match entity {
        Entity::Role(role) if role.name == CHAT_MEMBER_ROLE => Some(role.id.clone()),
        _ => None,
    });
    let Some(role_id) = role_id else {
        tracing::debug!(channel_id, "channel has no chat-member role");
        return Page::new(0, MEMBER_PAGE_LIMIT, 0, Vec::new());
    };

    resolver
        .resolve(
            EntityKind::Member,
            PageQuery::new(0, MEMBER_PAGE_LIMIT),
            Some(&role_id),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::entity::Role,
        platform::{
            fixtures::{demo_directory, DEMO_CHANNEL_ID},
            Directory,
        },
        test_support::principal,
    };

    #[tokio::test]
    async fn lists_holders_of_chat_member_role() {
        let resolver = PageResolver::new(demo_directory(), demo_directory());

        let page = list_channel_members(&resolver, DEMO_CHANNEL_ID).await;

        let names: Vec<_> = page.items.iter().map(Entity::display_label).collect();
        assert_eq!(names, ["alice", "bob", "carol", "dave"]);
        assert!(page
            .items
            .iter()
            .all(|entity| matches!(entity, Entity::RoleMember(_))));
        assert_eq!(page.error, None);
    }

    #[tokio::test]
    async fn similarly_named_role_does_not_count() {
        let directory = Directory::new()
            .with_user(principal("u1", "alice"))
            .with_role(
                "ch-1",
                Role::new("r1", "chat-member-legacy"),
            )
            .with_role_holder("r1", "u1");
        let resolver = PageResolver::new(directory.clone(), directory);

        let page = list_channel_members(&resolver, "ch-1").await;

        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.error, None);
    }

    #[tokio::test]
    async fn unknown_holder_fails_the_listing() {
        let directory = Directory::new()
            .with_role(
                "ch-1",
                Role::new("r1", CHAT_MEMBER_ROLE),
            )
            .with_role_holder("r1", "ghost");
        let resolver = PageResolver::new(directory.clone(), directory);

        let page = list_channel_members(&resolver, "ch-1").await;

        assert_eq!(page.error.as_deref(), Some("entity ghost not found"));
    }
}
