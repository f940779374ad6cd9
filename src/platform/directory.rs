//! In-memory identity and workspace directory.
//!
//! Answers listings the way the platform's HTTP API does: server-side name
//! filters on direct listings, unfiltered raw memberships for member listings.

use async_trait::async_trait;

use crate::{
    domain::{
        entity::{Channel, Domain, EntityKind, Role, SearchField},
        page::{Page, PageQuery, RawPage},
        principal::{Membership, Principal},
    },
    usecases::contracts::{FetchError, PageRequest, PrincipalLookup, RawPageFetcher},
};

#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: Vec<Principal>,
    domains: Vec<Domain>,
    /// `(domain id, channel)`
    channels: Vec<(String, Channel)>,
    /// `(container id, role)`
    roles: Vec<(String, Role)>,
    /// `(container id, membership)`
    memberships: Vec<(String, Membership)>,
    /// `(role id, principal id)`
    role_holders: Vec<(String, String)>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: Principal) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    pub fn with_channel(mut self, domain_id: &str, channel: Channel) -> Self {
        self.channels.push((domain_id.to_owned(), channel));
        self
    }

    pub fn with_role(mut self, container_id: &str, role: Role) -> Self {
        self.roles.push((container_id.to_owned(), role));
        self
    }

    pub fn with_membership(mut self, container_id: &str, membership: Membership) -> Self {
        self.memberships.push((container_id.to_owned(), membership));
        self
    }

    pub fn with_role_holder(mut self, role_id: &str, principal_id: &str) -> Self {
        self.role_holders
            .push((role_id.to_owned(), principal_id.to_owned()));
        self
    }

    fn is_role(&self, id: &str) -> bool {
        self.roles.iter().any(|(_, role)| role.id == id)
    }

    fn list_channels(&self, container_id: Option<&str>, query: &PageQuery) -> Page<Channel> {
        let needle = query.search_term(SearchField::Name);
        let channels = self
            .channels
            .iter()
            .filter(|(domain_id, _)| in_scope(container_id, domain_id))
            .map(|(_, channel)| channel)
            .filter(|channel| contains_ignore_case(&channel.name, needle))
            .cloned()
            .collect();

        Page::from_collection(channels, query.offset, query.limit)
    }

    fn list_users(&self, query: &PageQuery) -> Page<Principal> {
        let needle = query.search_term(SearchField::Username);
        let users = self
            .users
            .iter()
            .filter(|user| query.status.matches(user.status))
            .filter(|user| contains_ignore_case(&user.username, needle))
            .cloned()
            .collect();

        Page::from_collection(users, query.offset, query.limit)
    }

    fn list_domains(&self, query: &PageQuery) -> Page<Domain> {
        let needle = query.search_term(SearchField::Name);
        let domains = self
            .domains
            .iter()
            .filter(|domain| contains_ignore_case(&domain.name, needle))
            .cloned()
            .collect();

        Page::from_collection(domains, query.offset, query.limit)
    }

    fn list_roles(&self, container_id: Option<&str>, query: &PageQuery) -> Page<Role> {
        let needle = query.search_term(SearchField::RoleName);
        let roles = self
            .roles
            .iter()
            .filter(|(owner, _)| in_scope(container_id, owner))
            .map(|(_, role)| role)
            .filter(|role| contains_ignore_case(&role.name, needle))
            .cloned()
            .collect();

        Page::from_collection(roles, query.offset, query.limit)
    }

    fn list_members(&self, container_id: &str, query: &PageQuery) -> RawPage {
        if self.is_role(container_id) {
            let holders = self
                .role_holders
                .iter()
                .filter(|(role_id, _)| role_id == container_id)
                .map(|(_, principal_id)| principal_id.clone())
                .collect();

            return RawPage::RoleMembers(Page::from_collection(holders, query.offset, query.limit));
        }

        let memberships = self
            .memberships
            .iter()
            .filter(|(owner, _)| owner == container_id)
            .map(|(_, membership)| membership.clone())
            .collect();

        RawPage::Memberships(Page::from_collection(memberships, query.offset, query.limit))
    }
}

#[async_trait]
impl RawPageFetcher for Directory {
    async fn fetch_page(&self, request: PageRequest) -> Result<RawPage, FetchError> {
        let container_id = request.container_id.as_deref();
        let query = &request.query;

        let page = match request.kind {
            EntityKind::Channel => RawPage::Channels(self.list_channels(container_id, query)),
            EntityKind::User => RawPage::Users(self.list_users(query)),
            EntityKind::Domain => RawPage::Domains(self.list_domains(query)),
            EntityKind::Role => RawPage::Roles(self.list_roles(container_id, query)),
            EntityKind::Member => {
                let container_id = container_id.ok_or_else(|| {
                    FetchError::InvalidData("member listing needs a container id".to_owned())
                })?;
                self.list_members(container_id, query)
            }
        };

        Ok(page)
    }
}

#[async_trait]
impl PrincipalLookup for Directory {
    async fn lookup(&self, principal_id: &str) -> Result<Principal, FetchError> {
        self.users
            .iter()
            .find(|user| user.id == principal_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(principal_id.to_owned()))
    }
}

fn in_scope(container_id: Option<&str>, owner: &str) -> bool {
    container_id.map_or(true, |container_id| container_id == owner)
}

fn contains_ignore_case(field: &str, needle: Option<&str>) -> bool {
    needle.map_or(true, |needle| {
        field.to_lowercase().contains(&needle.to_lowercase())
    })
}
